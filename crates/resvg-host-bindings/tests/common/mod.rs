//! An in-process stand-in for the resvg guest.
//!
//! Implements the same export surface over a plain byte vector so the
//! binding layer can be exercised without a compiled renderer. It parses
//! only `width`/`height` attributes, fills the pixmap with one colour when
//! the document has a `<rect`, and produces real PNG files.

#![allow(dead_code)]

use std::collections::HashMap;

use image::ImageEncoder;
use image::codecs::png::PngEncoder;

use resvg_host_bindings::exports;
use resvg_host_common::RuntimeError;
use resvg_host_core::{GuestRuntime, InstanceId};

const MEMORY_SIZE: usize = 4 * 1024 * 1024;
const MAX_PIXELS: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub enum Object {
    Options,
    Tree {
        width: f32,
        height: f32,
        solid: bool,
        text_converted: bool,
    },
    FontDb {
        fonts: Vec<Vec<u8>>,
    },
    FitTo {
        zoom: f32,
    },
    Transform,
    Size {
        width: f32,
        height: f32,
    },
    ScreenSize {
        width: u32,
        height: u32,
    },
    Pixmap {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    Bytes {
        ptr: u32,
        len: u32,
    },
}

impl Object {
    fn kind(&self) -> &'static str {
        match self {
            Object::Options => "options",
            Object::Tree { .. } => "tree",
            Object::FontDb { .. } => "fontdb",
            Object::FitTo { .. } => "fit_to",
            Object::Transform => "transform",
            Object::Size { .. } => "size",
            Object::ScreenSize { .. } => "screen_size",
            Object::Pixmap { .. } => "pixmap",
            Object::Bytes { .. } => "bytes",
        }
    }
}

pub struct FakeGuest {
    id: InstanceId,
    memory: Vec<u8>,
    next_free: u32,
    pub objects: HashMap<i32, Object>,
    pub allocations: HashMap<i32, i32>,
    pub calls: Vec<String>,
    /// Fonts present in the database each time text was converted.
    pub fonts_at_convert: Vec<Vec<Vec<u8>>>,
    /// Export that traps instead of running.
    pub trap_on: Option<&'static str>,
    /// Constructor export that returns null instead of running.
    pub null_on: Option<&'static str>,
    /// Status export that returns this code instead of running.
    pub status_on: Option<(&'static str, i32)>,
}

impl Default for FakeGuest {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGuest {
    pub fn new() -> Self {
        Self {
            id: InstanceId::next(),
            memory: vec![0; MEMORY_SIZE],
            next_free: 1024,
            objects: HashMap::new(),
            allocations: HashMap::new(),
            calls: Vec::new(),
            fonts_at_convert: Vec::new(),
            trap_on: None,
            null_on: None,
            status_on: None,
        }
    }

    pub fn trapping(export: &'static str) -> Self {
        Self {
            trap_on: Some(export),
            ..Self::new()
        }
    }

    pub fn returning_null(export: &'static str) -> Self {
        Self {
            null_on: Some(export),
            ..Self::new()
        }
    }

    pub fn failing_status(export: &'static str, code: i32) -> Self {
        Self {
            status_on: Some((export, code)),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn count(&self, export: &str) -> usize {
        self.calls.iter().filter(|name| *name == export).count()
    }

    /// Guest objects and byte allocations still alive.
    pub fn live(&self) -> usize {
        self.objects.len() + self.allocations.len()
    }

    fn bump(&mut self, len: u32) -> Result<u32, String> {
        let ptr = self.next_free;
        let end = ptr
            .checked_add(len.max(1))
            .map(|end| (end + 7) & !7)
            .ok_or("out of memory")?;
        if end as usize > MEMORY_SIZE {
            return Err("out of memory".into());
        }
        self.next_free = end;
        Ok(ptr)
    }

    fn store(&mut self, object: Object) -> Result<Vec<i32>, String> {
        let ptr = self.bump(16)?;
        let key = ptr as i32;
        self.objects.insert(key, object);
        Ok(vec![key])
    }

    fn get(&self, key: i32, kind: &str) -> Result<&Object, String> {
        match self.objects.get(&key) {
            Some(object) if object.kind() == kind => Ok(object),
            Some(object) => Err(format!("expected {kind}, found {}", object.kind())),
            None => Err(format!("dangling {kind} pointer {key}")),
        }
    }

    fn free(&mut self, key: i32, kind: &str) -> Result<Vec<i32>, String> {
        self.get(key, kind)?;
        self.objects.remove(&key);
        Ok(Vec::new())
    }

    fn slice(&self, ptr: i32, len: i32) -> Result<&[u8], String> {
        if len == 0 {
            return Ok(&[]);
        }
        let start = usize::try_from(ptr).map_err(|_| "bad pointer")?;
        let end = start + usize::try_from(len).map_err(|_| "bad length")?;
        self.memory.get(start..end).ok_or_else(|| "out of bounds".to_string())
    }

    fn dispatch(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, String> {
        let arg = |i: usize| args.get(i).copied().ok_or_else(|| format!("{export}: missing argument {i}"));

        match export {
            exports::ALLOC => {
                let len = arg(0)?;
                let ptr = self.bump(len as u32)? as i32;
                self.allocations.insert(ptr, len);
                Ok(vec![ptr])
            }
            exports::DEALLOC => match self.allocations.remove(&arg(0)?) {
                Some(len) if len == arg(1)? => Ok(Vec::new()),
                Some(_) => Err("dealloc length mismatch".into()),
                None => Err("dealloc of unknown pointer".into()),
            },
            exports::BYTES_PTR => match self.get(arg(0)?, "bytes")? {
                Object::Bytes { ptr, .. } => Ok(vec![*ptr as i32]),
                _ => unreachable!(),
            },
            exports::BYTES_LEN => match self.get(arg(0)?, "bytes")? {
                Object::Bytes { len, .. } => Ok(vec![*len as i32]),
                _ => unreachable!(),
            },
            exports::BYTES_FREE => self.free(arg(0)?, "bytes"),

            exports::OPTIONS_DEFAULT => self.store(Object::Options),
            exports::OPTIONS_FREE => self.free(arg(0)?, "options"),

            exports::TREE_FROM_DATA => {
                self.get(arg(2)?, "options")?;
                let document = self.slice(arg(0)?, arg(1)?)?.to_vec();
                match parse_document(&document) {
                    Some(tree) => self.store(tree),
                    None => Ok(vec![0]),
                }
            }
            exports::TREE_CONVERT_TEXT => {
                let fonts = match self.get(arg(1)?, "fontdb")? {
                    Object::FontDb { fonts } => fonts.clone(),
                    _ => unreachable!(),
                };
                self.get(arg(0)?, "tree")?;
                self.fonts_at_convert.push(fonts);
                if let Some(Object::Tree { text_converted, .. }) = self.objects.get_mut(&arg(0)?) {
                    *text_converted = true;
                }
                Ok(vec![0])
            }
            exports::TREE_GET_SIZE_CLONE => match self.get(arg(0)?, "tree")?.clone() {
                Object::Tree { width, height, .. } => self.store(Object::Size { width, height }),
                _ => unreachable!(),
            },
            exports::TREE_FREE => self.free(arg(0)?, "tree"),

            exports::FONTDB_NEW => self.store(Object::FontDb { fonts: Vec::new() }),
            exports::FONTDB_LOAD_FONT_DATA => {
                let font = self.slice(arg(1)?, arg(2)?)?.to_vec();
                if font.is_empty() {
                    return Ok(vec![1]);
                }
                match self.objects.get_mut(&arg(0)?) {
                    Some(Object::FontDb { fonts }) => {
                        fonts.push(font);
                        Ok(vec![0])
                    }
                    _ => Err("load into non-database".into()),
                }
            }
            exports::FONTDB_FREE => self.free(arg(0)?, "fontdb"),

            exports::FIT_TO_ORIGINAL => self.store(Object::FitTo { zoom: 1.0 }),
            exports::FIT_TO_ZOOM => {
                let zoom = exports::f32_from_arg(arg(0)?);
                if zoom.is_finite() && zoom > 0.0 {
                    self.store(Object::FitTo { zoom })
                } else {
                    Ok(vec![0])
                }
            }
            exports::FIT_TO_WIDTH | exports::FIT_TO_HEIGHT => {
                arg(0)?;
                self.store(Object::FitTo { zoom: 1.0 })
            }
            exports::FIT_TO_SIZE => {
                arg(1)?;
                self.store(Object::FitTo { zoom: 1.0 })
            }
            exports::FIT_TO_FREE => self.free(arg(0)?, "fit_to"),

            exports::TRANSFORM_DEFAULT => self.store(Object::Transform),
            exports::TRANSFORM_FROM_ROW => {
                arg(5)?;
                self.store(Object::Transform)
            }
            exports::TRANSFORM_FREE => self.free(arg(0)?, "transform"),

            exports::SIZE_TO_SCREEN_SIZE => match self.get(arg(0)?, "size")?.clone() {
                Object::Size { width, height } => {
                    if width.is_finite() && height.is_finite() && width >= 1.0 && height >= 1.0 {
                        self.store(Object::ScreenSize {
                            width: width.ceil() as u32,
                            height: height.ceil() as u32,
                        })
                    } else {
                        Ok(vec![0])
                    }
                }
                _ => unreachable!(),
            },
            exports::SIZE_FREE => self.free(arg(0)?, "size"),
            exports::SCREEN_SIZE_WIDTH => match self.get(arg(0)?, "screen_size")? {
                Object::ScreenSize { width, .. } => Ok(vec![*width as i32]),
                _ => unreachable!(),
            },
            exports::SCREEN_SIZE_HEIGHT => match self.get(arg(0)?, "screen_size")? {
                Object::ScreenSize { height, .. } => Ok(vec![*height as i32]),
                _ => unreachable!(),
            },
            exports::SCREEN_SIZE_FREE => self.free(arg(0)?, "screen_size"),

            exports::PIXMAP_NEW => {
                let (width, height) = (arg(0)?, arg(1)?);
                if width <= 0 || height <= 0 || (width as u64) * (height as u64) > MAX_PIXELS {
                    return Ok(vec![0]);
                }
                let (width, height) = (width as u32, height as u32);
                self.store(Object::Pixmap {
                    width,
                    height,
                    pixels: vec![0; (width * height * 4) as usize],
                })
            }
            exports::PIXMAP_ENCODE_PNG => {
                let png = match self.get(arg(0)?, "pixmap")? {
                    Object::Pixmap {
                        width,
                        height,
                        pixels,
                    } => encode_png(pixels, *width, *height)?,
                    _ => unreachable!(),
                };
                let ptr = self.bump(png.len() as u32)?;
                self.memory[ptr as usize..ptr as usize + png.len()].copy_from_slice(&png);
                self.store(Object::Bytes {
                    ptr,
                    len: png.len() as u32,
                })
            }
            exports::PIXMAP_FREE => self.free(arg(0)?, "pixmap"),

            exports::RENDER => {
                let solid = match self.get(arg(0)?, "tree")? {
                    Object::Tree { solid, .. } => *solid,
                    _ => unreachable!(),
                };
                self.get(arg(1)?, "fit_to")?;
                self.get(arg(2)?, "transform")?;
                self.get(arg(3)?, "pixmap")?;
                // The renderer takes ownership of the fit mode and transform.
                self.objects.remove(&arg(1)?);
                self.objects.remove(&arg(2)?);
                if let Some(Object::Pixmap { pixels, .. }) = self.objects.get_mut(&arg(3)?) {
                    if solid {
                        for px in pixels.chunks_exact_mut(4) {
                            px.copy_from_slice(&[0x33, 0x66, 0x99, 0xff]);
                        }
                    }
                }
                Ok(vec![0])
            }

            other => Err(format!("unknown export {other}")),
        }
    }
}

impl GuestRuntime for FakeGuest {
    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn call(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, RuntimeError> {
        self.calls.push(export.to_string());

        if self.trap_on == Some(export) {
            return Err(RuntimeError::trap(export, "unreachable"));
        }
        if self.null_on == Some(export) {
            return Ok(vec![0]);
        }
        if let Some((name, code)) = self.status_on {
            if name == export {
                return Ok(vec![code]);
            }
        }

        self.dispatch(export, args).map_err(|message| {
            if message.starts_with("unknown export") {
                RuntimeError::export_not_found(export)
            } else {
                RuntimeError::trap(export, message)
            }
        })
    }

    fn read_memory(&mut self, offset: u32, len: u32) -> Result<Vec<u8>, RuntimeError> {
        let start = offset as usize;
        self.memory
            .get(start..start + len as usize)
            .map(<[u8]>::to_vec)
            .ok_or(RuntimeError::MemoryAccess { offset, len })
    }

    fn write_memory(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
        let start = offset as usize;
        let target = self
            .memory
            .get_mut(start..start + bytes.len())
            .ok_or(RuntimeError::MemoryAccess {
                offset,
                len: bytes.len() as u32,
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }
}

fn parse_document(document: &[u8]) -> Option<Object> {
    let text = std::str::from_utf8(document).ok()?;
    let root = text.find("<svg")?;
    let tag_end = root + text[root..].find('>')?;
    let tag = &text[root..tag_end];

    Some(Object::Tree {
        width: attribute(tag, "width")?,
        height: attribute(tag, "height")?,
        solid: text.contains("<rect"),
        text_converted: false,
    })
}

fn attribute(tag: &str, name: &str) -> Option<f32> {
    let needle = format!(" {name}=\"");
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    tag[start..start + len].parse().ok()
}

fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, String> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(pixels, width, height, image::ColorType::Rgba8)
        .map_err(|e| e.to_string())?;
    Ok(png)
}

/// A minimal document with a single solid rectangle.
pub const RECT_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="30" viewBox="0 0 40 30">
    <rect x="0" y="0" width="40" height="30" fill="#336699"/>
</svg>"##;

/// A document whose text asks for a font nobody loads.
pub const TEXT_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="120" height="24">
    <text x="0" y="20" font-family="Some System Font">Hello</text>
</svg>"#;

/// Decode PNG bytes, returning the image dimensions.
pub fn png_dimensions(png: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory_with_format(png, image::ImageFormat::Png).unwrap();
    (image.width(), image.height())
}

pub const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
