mod build;
mod gallery;
mod interaction;
mod view;

pub(super) use interaction::PointerFrame;
pub(super) use view::fuzzy_match_score;
