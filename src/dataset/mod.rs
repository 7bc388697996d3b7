mod category;
mod collect;
mod fetch;
mod gallery;
mod graph;
mod parse;

pub use category::{Category, EntityKey, Group};
pub use collect::{LoadedData, Site, Sources, build_dataset, load_sources, nearest_sites};
pub use fetch::DataSource;
pub use gallery::{Gallery, GalleryConcept, GalleryImage};
pub use graph::{Connection, Dataset, Entity};
pub use parse::{
    ConceptRecord, ExternalLinks, GalleryRecord, ProducerRecord, parse_concepts, parse_gallery,
    parse_producers, split_list,
};
