use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2, vec2};

use lauds_landscape::dataset::{Category, Group};
use lauds_landscape::util::stable_pair;

pub(super) const ACCENT: Color32 = Color32::from_rgb(255, 92, 0);
pub(super) const GALLERY_TILE_RADIUS: f32 = 50.0;
pub(super) const GALLERY_IMAGE_SIZE: f32 = 40.0;
pub(super) const GALLERY_IMAGE_PADDING: f32 = 2.0;
pub(super) const GALLERY_IMAGES_PER_ROW: usize = 4;

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let t = amount.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
    Color32::from_rgba_unmultiplied(
        mix(base.r(), overlay.r()),
        mix(base.g(), overlay.g()),
        mix(base.b(), overlay.b()),
        mix(base.a(), overlay.a()),
    )
}

/// Darkens towards black. Alpha fades more slowly than the colour.
pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    let scale = |channel: u8, by: f32| (f32::from(channel) * by) as u8;
    Color32::from_rgba_unmultiplied(
        scale(color.r(), factor),
        scale(color.g(), factor),
        scale(color.b(), factor),
        scale(color.a(), 0.45 + factor * 0.55),
    )
}

const CANVAS_FILL: Color32 = Color32::from_rgb(22, 22, 24);
const GRID_STROKE: Stroke = Stroke {
    width: 1.0,
    color: Color32::from_rgba_premultiplied(26, 26, 28, 48),
};

/// Canvas fill plus a grid that follows pan and zoom.
pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, CANVAS_FILL);

    let spacing = (60.0 * zoom.clamp(0.5, 2.0)).max(18.0);
    let anchor = rect.center() + pan;
    let first = pos2(
        rect.left() + (anchor.x - rect.left()).rem_euclid(spacing),
        rect.top() + (anchor.y - rect.top()).rem_euclid(spacing),
    );

    let columns = ((rect.right() - first.x) / spacing).ceil().max(0.0) as usize;
    for column in 0..columns {
        let x = first.x + column as f32 * spacing;
        painter.vline(x, rect.y_range(), GRID_STROKE);
    }
    let rows = ((rect.bottom() - first.y) / spacing).ceil().max(0.0) as usize;
    for row in 0..rows {
        let y = first.y + row as f32 * spacing;
        painter.hline(rect.x_range(), y, GRID_STROKE);
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Whether the segment crosses `rect`, padded by `padding` on every side.
pub(super) fn edge_visible(rect: Rect, start: Pos2, end: Pos2, padding: f32) -> bool {
    let rect = rect.expand(padding);
    if !rect.intersects(Rect::from_two_pos(start, end)) {
        return false;
    }
    if rect.contains(start) || rect.contains(end) {
        return true;
    }

    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ];
    (0..4).any(|side| segments_cross(start, end, corners[side], corners[(side + 1) % 4]))
}

fn segments_cross(a1: Pos2, a2: Pos2, b1: Pos2, b2: Pos2) -> bool {
    let side = |o: Pos2, a: Pos2, p: Pos2| (a - o).x * (p - o).y - (a - o).y * (p - o).x;
    let straddles = |x: f32, y: f32| (x <= 0.0 && y >= 0.0) || (x >= 0.0 && y <= 0.0);

    straddles(side(a1, a2, b1), side(a1, a2, b2)) && straddles(side(b1, b2, a1), side(b1, b2, a2))
}

pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + world * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    (screen - rect.center() - pan) / zoom
}

pub(super) fn category_color(category: Category) -> Color32 {
    match category {
        Category::Values => ACCENT,
        Category::Materials => Color32::from_rgb(151, 71, 255),
        Category::ProcessesAndTechnologies => Color32::from_rgb(160, 160, 160),
        Category::KnowledgeSharing => Color32::from_rgb(228, 228, 228),
    }
}

pub(super) fn group_color(group: Group) -> Color32 {
    group.category().map_or(ACCENT, category_color)
}

/// World-space radius used for hit testing and collision.
pub(super) fn node_radius(group: Group) -> f32 {
    match group {
        Group::Producer => 12.0,
        Group::Concept(_) | Group::Cluster => 10.0,
    }
}

/// Outline points of each concept glyph, in unscaled units around the origin.
fn glyph_points(category: Category) -> &'static [(f32, f32)] {
    match category {
        Category::Values => &[
            (-8.0, -8.0),
            (8.0, -8.0),
            (4.0, 0.0),
            (8.0, 8.0),
            (-8.0, 8.0),
            (-4.0, 0.0),
        ],
        Category::Materials => &[(-8.0, -8.0), (8.0, -8.0), (8.0, 8.0), (-8.0, 8.0)],
        Category::ProcessesAndTechnologies => &[(-10.0, 10.0), (10.0, 10.0), (0.0, -10.0)],
        Category::KnowledgeSharing => &[
            (-10.0, 0.0),
            (-5.0, 9.0),
            (5.0, 9.0),
            (10.0, 0.0),
            (5.0, -9.0),
            (-5.0, -9.0),
        ],
    }
}

/// Producers are hollow rings; concepts are filled glyphs per category.
pub(super) fn draw_node_glyph(
    painter: &Painter,
    group: Group,
    center: Pos2,
    scale: f32,
    color: Color32,
) {
    match group.category() {
        None => {
            painter.circle_stroke(center, 12.0 * scale, Stroke::new((2.0 * scale).max(1.0), color));
        }
        Some(Category::Values) => {
            // The bow-tie is concave, so it is drawn as two convex halves.
            let points = glyph_points(Category::Values);
            for half in [[0, 1, 2, 5], [5, 2, 3, 4]] {
                let outline = half
                    .iter()
                    .map(|&corner| {
                        let (x, y) = points[corner];
                        center + vec2(x, y) * scale
                    })
                    .collect();
                painter.add(Shape::convex_polygon(outline, color, Stroke::NONE));
            }
        }
        Some(category) => {
            let outline = glyph_points(category)
                .iter()
                .map(|&(x, y)| center + vec2(x, y) * scale)
                .collect();
            painter.add(Shape::convex_polygon(outline, color, Stroke::NONE));
        }
    }
}

/// Stand-in colour for an image, stable per owner.
pub(super) fn owner_tint(owner: Option<&str>, base: Color32) -> Color32 {
    let Some(owner) = owner else {
        return dim_color(base, 0.6);
    };
    let (a, b) = stable_pair(owner);
    let overlay = Color32::from_rgb(
        (128.0 + a * 110.0) as u8,
        (128.0 + b * 110.0) as u8,
        (128.0 - a * b * 90.0) as u8,
    );
    blend_color(base, overlay, 0.55)
}

/// Top-left corner of image `index` of `count`, relative to the centre of an
/// unzoomed gallery tile.
pub(super) fn gallery_image_offset(index: usize, count: usize) -> Vec2 {
    let cell = GALLERY_IMAGE_SIZE + GALLERY_IMAGE_PADDING;
    let rows = count.div_ceil(GALLERY_IMAGES_PER_ROW).max(1);
    let width = GALLERY_IMAGES_PER_ROW as f32 * cell;
    let height = rows as f32 * cell;
    let row = index / GALLERY_IMAGES_PER_ROW;
    let column = index % GALLERY_IMAGES_PER_ROW;
    vec2(
        column as f32 * cell - width / 2.0 + GALLERY_IMAGE_PADDING,
        row as f32 * cell - height / 2.0,
    )
}

pub(super) fn gallery_tile_rect(center: Pos2, count: usize, zoom: f32) -> Rect {
    let cell = GALLERY_IMAGE_SIZE + GALLERY_IMAGE_PADDING;
    let rows = count.div_ceil(GALLERY_IMAGES_PER_ROW).max(1);
    let half = vec2(GALLERY_IMAGES_PER_ROW as f32 * cell, rows as f32 * cell) * (zoom / 2.0);
    Rect::from_center_size(center, half * 2.0)
}
