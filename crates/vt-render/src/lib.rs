pub mod hit;
pub mod paint;
pub mod scene;

pub use hit::{hit_test, hit_test_document, hit_test_rect};
pub use paint::{PaintItem, PaintSurface, build_paint_list, paint_document, paint_layer};
pub use scene::VelloSurface;
