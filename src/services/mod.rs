//! Asset Studio Services
//!
//! Geometry, drawing, the two-stage compositor, encoding, export and the
//! remote AI collaborators.

pub mod cache;
pub mod canvas;
pub mod compositor;
pub mod encoder;
pub mod export;
pub mod geometry;
pub mod outpaint;
pub mod preferences;
pub mod progress;
pub mod remote;
pub mod removal;
pub mod transform;

pub use cache::BitmapCache;
pub use canvas::{
    apply_crop, blur_radius, centered_rect, draw_blurred_background, draw_centered_image,
    draw_gradient_background, draw_mirrored_edges, draw_solid_background, draw_stretched_edges,
    Canvas, DestRect,
};
pub use compositor::{compose_canvas, Compositor, ProcessedSource, AI_PLACEHOLDER};
pub use encoder::{
    canvas_to_blob, encode_image, optimize_to_target_size, png_to_ico, EncodeError, OptimizedBlob,
};
pub use export::{
    build_batch_archive, encode_export, export_batch, export_single, generate_filename,
    ExportError, ExportResult,
};
pub use geometry::calculate_target_dimensions;
pub use outpaint::{
    prepare_outpaint_input, prepare_outpaint_mask, HttpOutpaintTransport, OutpaintError,
    OutpaintOptions, OutpaintProvider, OutpaintRequest, OutpaintResponse, OutpaintService,
    OutpaintTransport, DEFAULT_PROMPT,
};
pub use preferences::{PreferenceError, PreferenceStore, Preferences, DEFAULT_AI_STRENGTH};
pub use progress::{ProgressEvent, ProgressReceiver, ProgressReporter, RemovalPhase};
pub use removal::{BackgroundRemover, RemoteBackgroundRemover, RemovalError};
pub use transform::{apply_transformations, create_preview_canvas, load_image};
