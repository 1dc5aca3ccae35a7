//! Names of the guest exports.
//!
//! Every export takes and returns `i32` only. Offsets of guest objects are
//! passed as the bit pattern of a `u32`; `f32` arguments as the bit pattern
//! of their IEEE 754 encoding.

// Byte transfer
pub const ALLOC: &str = "__alloc";
pub const DEALLOC: &str = "__dealloc";
pub const BYTES_PTR: &str = "__bytes_ptr";
pub const BYTES_LEN: &str = "__bytes_len";
pub const BYTES_FREE: &str = "__bytes_free";

// usvg::Options
pub const OPTIONS_DEFAULT: &str = "__usvg_options_default";
pub const OPTIONS_FREE: &str = "__usvg_options_free";

// usvg::Tree
pub const TREE_FROM_DATA: &str = "__usvg_tree_from_data";
pub const TREE_CONVERT_TEXT: &str = "__usvg_tree_convert_text";
pub const TREE_GET_SIZE_CLONE: &str = "__usvg_tree_get_size_clone";
pub const TREE_FREE: &str = "__usvg_tree_free";

// fontdb::Database
pub const FONTDB_NEW: &str = "__fontdb_database_new";
pub const FONTDB_LOAD_FONT_DATA: &str = "__fontdb_database_load_font_data";
pub const FONTDB_FREE: &str = "__fontdb_database_free";

// usvg::FitTo
pub const FIT_TO_ORIGINAL: &str = "__usvg_fit_to_original";
pub const FIT_TO_ZOOM: &str = "__usvg_fit_to_zoom";
pub const FIT_TO_WIDTH: &str = "__usvg_fit_to_width";
pub const FIT_TO_HEIGHT: &str = "__usvg_fit_to_height";
pub const FIT_TO_SIZE: &str = "__usvg_fit_to_size";
pub const FIT_TO_FREE: &str = "__usvg_fit_to_free";

// tiny_skia::Transform
pub const TRANSFORM_DEFAULT: &str = "__tiny_skia_transform_default";
pub const TRANSFORM_FROM_ROW: &str = "__tiny_skia_transform_from_row";
pub const TRANSFORM_FREE: &str = "__tiny_skia_transform_free";

// usvg::Size / usvg::ScreenSize
pub const SIZE_TO_SCREEN_SIZE: &str = "__usvg_size_to_screen_size";
pub const SIZE_FREE: &str = "__usvg_size_free";
pub const SCREEN_SIZE_WIDTH: &str = "__usvg_screen_size_width";
pub const SCREEN_SIZE_HEIGHT: &str = "__usvg_screen_size_height";
pub const SCREEN_SIZE_FREE: &str = "__usvg_screen_size_free";

// tiny_skia::Pixmap
pub const PIXMAP_NEW: &str = "__tiny_skia_pixmap_new";
pub const PIXMAP_ENCODE_PNG: &str = "__tiny_skia_pixmap_encode_png";
pub const PIXMAP_FREE: &str = "__tiny_skia_pixmap_free";

// resvg
pub const RENDER: &str = "__resvg_render";

/// Every export the bindings call.
pub const ALL: &[&str] = &[
    ALLOC,
    DEALLOC,
    BYTES_PTR,
    BYTES_LEN,
    BYTES_FREE,
    OPTIONS_DEFAULT,
    OPTIONS_FREE,
    TREE_FROM_DATA,
    TREE_CONVERT_TEXT,
    TREE_GET_SIZE_CLONE,
    TREE_FREE,
    FONTDB_NEW,
    FONTDB_LOAD_FONT_DATA,
    FONTDB_FREE,
    FIT_TO_ORIGINAL,
    FIT_TO_ZOOM,
    FIT_TO_WIDTH,
    FIT_TO_HEIGHT,
    FIT_TO_SIZE,
    FIT_TO_FREE,
    TRANSFORM_DEFAULT,
    TRANSFORM_FROM_ROW,
    TRANSFORM_FREE,
    SIZE_TO_SCREEN_SIZE,
    SIZE_FREE,
    SCREEN_SIZE_WIDTH,
    SCREEN_SIZE_HEIGHT,
    SCREEN_SIZE_FREE,
    PIXMAP_NEW,
    PIXMAP_ENCODE_PNG,
    PIXMAP_FREE,
    RENDER,
];

/// Encode an `f32` argument.
pub fn f32_arg(value: f32) -> i32 {
    i32::from_ne_bytes(value.to_bits().to_ne_bytes())
}

/// Decode an `f32` argument.
pub fn f32_from_arg(arg: i32) -> f32 {
    f32::from_bits(u32::from_ne_bytes(arg.to_ne_bytes()))
}
