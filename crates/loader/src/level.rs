//! Level loader: a single-pass state machine over the markup token stream.
//!
//! Every open element pushes a typed [`Frame`]; attributes land in bounded per-field buffers
//! of the innermost frame; closing a frame turns its buffers into layers, spawn requests or
//! object parameters. Nothing touches engine state here: the result is a [`LevelData`] the
//! engine commits in one go.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tilespace_common::{MapRect, MapRemap, leading_float, leading_int};
use tilespace_object::{
    ObjectParams, PARAM_STRING_CAPACITY, ParamValue, SpawnArgs, SpawnRequest, TypeCatalog,
};
use tilespace_world::{MAX_WORLD_LAYERS, TileId, WorldLayer};

use crate::error::LoadError;
use crate::markup::{Token, Tokenizer};

/// Bytes kept per attribute value; the rest is dropped with a warning.
pub const ATTR_CAPACITY: usize = 128;

/// Largest grid a layer may declare.
pub const MAX_LAYER_CELLS: usize = 1 << 22;

const READ_CHUNK: usize = 4096;

/// Counters for everything the loader skipped or clipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub skipped_objects: usize,
    pub skipped_layers: usize,
    pub dropped_properties: usize,
    pub truncated_values: usize,
    pub overflowing_tiles: usize,
}

/// Everything one level file defines, ready to be committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelData {
    pub layers: Vec<WorldLayer>,
    pub objects: Vec<SpawnRequest>,
    pub stats: LoadStats,
}

impl LevelData {
    /// SHA-256 over layer grids and object placements, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.layers.len() as u64).to_le_bytes());
        for layer in &self.layers {
            hasher.update(layer.width().to_le_bytes());
            hasher.update(layer.height().to_le_bytes());
            for id in layer.tiles() {
                hasher.update(id.to_le_bytes());
            }
        }
        hasher.update((self.objects.len() as u64).to_le_bytes());
        for obj in &self.objects {
            hasher.update((obj.type_name.len() as u64).to_le_bytes());
            hasher.update(obj.type_name.as_bytes());
            let a = &obj.args;
            for v in [a.position.x, a.position.y, a.angle, a.size.x, a.size.y] {
                hasher.update(v.to_bits().to_le_bytes());
            }
            hasher.update([u8::from(a.visible)]);
            for param in obj.params.iter() {
                hasher.update(param.key.to_le_bytes());
                match &param.value {
                    ParamValue::Int(v) => {
                        hasher.update([b'i']);
                        hasher.update(v.to_le_bytes());
                    }
                    ParamValue::Uint(v) => {
                        hasher.update([b'u']);
                        hasher.update(v.to_le_bytes());
                    }
                    ParamValue::Float(v) => {
                        hasher.update([b'f']);
                        hasher.update(v.to_bits().to_le_bytes());
                    }
                    ParamValue::Str(s) => {
                        hasher.update([b's']);
                        hasher.update((s.len() as u64).to_le_bytes());
                        hasher.update(s.as_bytes());
                    }
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Bounded attribute value buffer.
#[derive(Debug, Default)]
struct AttrBuf {
    bytes: Vec<u8>,
    set: bool,
    truncated: bool,
}

impl AttrBuf {
    fn reset(&mut self) {
        self.bytes.clear();
        self.set = true;
        self.truncated = false;
    }

    /// Append, clipping at [`ATTR_CAPACITY`]. Returns `true` the first time bytes are dropped.
    fn push(&mut self, chunk: &[u8]) -> bool {
        let room = ATTR_CAPACITY.saturating_sub(self.bytes.len());
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if chunk.len() > room && !self.truncated {
            self.truncated = true;
            return true;
        }
        false
    }

    fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    fn int(&self) -> i64 {
        leading_int(&self.text())
    }

    fn float(&self) -> f32 {
        leading_float(&self.text())
    }
}

/// Attribute fields a frame can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Width,
    Height,
    Name,
    Encoding,
    Type,
    X,
    Y,
    Rotation,
    Visible,
    Value,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "width" => Self::Width,
            "height" => Self::Height,
            "name" => Self::Name,
            "encoding" => Self::Encoding,
            "type" | "class" => Self::Type,
            "x" => Self::X,
            "y" => Self::Y,
            "rotation" | "angle" => Self::Rotation,
            "visible" => Self::Visible,
            "value" => Self::Value,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Name => "name",
            Self::Encoding => "encoding",
            Self::Type => "type",
            Self::X => "x",
            Self::Y => "y",
            Self::Rotation => "rotation",
            Self::Visible => "visible",
            Self::Value => "value",
        }
    }
}

#[derive(Debug, Default)]
struct LayerFrame {
    width: AttrBuf,
    height: AttrBuf,
    name: AttrBuf,
    grid: Option<Grid>,
    skipped: bool,
}

#[derive(Debug)]
struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
    written: usize,
    overflow_warned: bool,
}

impl LayerFrame {
    fn dims(&self) -> (u32, u32) {
        let clamp = |v: i64| v.clamp(0, i64::from(u32::MAX)) as u32;
        (clamp(self.width.int()), clamp(self.height.int()))
    }

    /// The layer's tile grid, allocated from its attributes on first use. Oversized layers
    /// get an empty grid and are marked skipped.
    fn grid(&mut self) -> &mut Grid {
        let (mut width, mut height) = self.dims();
        if self.grid.is_none() && u64::from(width) * u64::from(height) > MAX_LAYER_CELLS as u64 {
            tracing::warn!(
                layer = %self.name.text(),
                width,
                height,
                max_cells = MAX_LAYER_CELLS,
                "layer too large, skipping"
            );
            self.skipped = true;
            (width, height) = (0, 0);
        }
        self.grid.get_or_insert_with(|| Grid {
            width,
            height,
            tiles: vec![0; width as usize * height as usize],
            written: 0,
            overflow_warned: false,
        })
    }
}

impl Grid {
    /// Store the next CSV tile id. Ids past `width * height` are dropped.
    fn commit(&mut self, id: TileId, stats: &mut LoadStats) {
        let cells = self.tiles.len();
        if self.written >= cells {
            stats.overflowing_tiles += 1;
            if !self.overflow_warned {
                self.overflow_warned = true;
                tracing::warn!(
                    width = self.width,
                    height = self.height,
                    "layer data holds more tile ids than the layer has cells, ignoring the rest"
                );
            }
            return;
        }
        let n = self.written;
        let x = n % self.width as usize;
        let row = self.height as usize - 1 - n / self.width as usize;
        self.tiles[row * self.width as usize + x] = id;
        self.written += 1;
    }
}

#[derive(Debug, Default)]
struct DataFrame {
    encoding: AttrBuf,
    checked: Option<bool>,
    value: u64,
    pending: bool,
    /// The current cell's number has ended; anything up to the next comma is ignored.
    cell_closed: bool,
}

impl DataFrame {
    fn is_csv(&mut self) -> bool {
        let encoding = &self.encoding;
        *self
            .checked
            .get_or_insert_with(|| encoding.set && encoding.text() == "csv")
    }
}

#[derive(Debug, Default)]
struct ObjectFrame {
    type_name: AttrBuf,
    x: AttrBuf,
    y: AttrBuf,
    width: AttrBuf,
    height: AttrBuf,
    rotation: AttrBuf,
    visible: AttrBuf,
    params: ObjectParams,
}

#[derive(Debug, Default)]
struct PropertyFrame {
    name: AttrBuf,
    value: AttrBuf,
}

#[derive(Debug)]
enum Frame {
    Layer(LayerFrame),
    Data(DataFrame),
    Object(ObjectFrame),
    Property(PropertyFrame),
    /// `map`, `objectgroup`, `properties`, `tileset` and anything else without fields.
    Other,
}

impl Frame {
    fn field(&mut self, field: Field) -> Option<&mut AttrBuf> {
        match (self, field) {
            (Frame::Layer(l), Field::Width) => Some(&mut l.width),
            (Frame::Layer(l), Field::Height) => Some(&mut l.height),
            (Frame::Layer(l), Field::Name) => Some(&mut l.name),
            (Frame::Data(d), Field::Encoding) => Some(&mut d.encoding),
            (Frame::Object(o), Field::Type) => Some(&mut o.type_name),
            (Frame::Object(o), Field::X) => Some(&mut o.x),
            (Frame::Object(o), Field::Y) => Some(&mut o.y),
            (Frame::Object(o), Field::Width) => Some(&mut o.width),
            (Frame::Object(o), Field::Height) => Some(&mut o.height),
            (Frame::Object(o), Field::Rotation) => Some(&mut o.rotation),
            (Frame::Object(o), Field::Visible) => Some(&mut o.visible),
            (Frame::Property(p), Field::Name) => Some(&mut p.name),
            (Frame::Property(p), Field::Value) => Some(&mut p.value),
            _ => None,
        }
    }
}

/// Parser state shared across tokens.
struct Machine<'c> {
    catalog: &'c dyn TypeCatalog,
    frames: Vec<Frame>,
    field: Option<Field>,
    layers: Vec<WorldLayer>,
    objects: Vec<SpawnRequest>,
    last_dims: Option<(u32, u32)>,
    stats: LoadStats,
}

impl<'c> Machine<'c> {
    fn on_token(&mut self, token: Token<'_>) {
        match token {
            Token::ElemStart(name) => self.open(name),
            Token::AttrStart(name) => {
                self.field = Field::parse(name).filter(|&f| {
                    self.frames
                        .last_mut()
                        .and_then(|frame| frame.field(f))
                        .map(AttrBuf::reset)
                        .is_some()
                });
            }
            Token::AttrValue(bytes) => {
                let Some(field) = self.field else { return };
                let Some(buf) = self.frames.last_mut().and_then(|f| f.field(field)) else {
                    return;
                };
                if buf.push(bytes) {
                    self.stats.truncated_values += 1;
                    tracing::warn!(
                        attribute = field.as_str(),
                        capacity = ATTR_CAPACITY,
                        "attribute value too long, truncating"
                    );
                }
            }
            Token::AttrEnd => self.field = None,
            Token::Content(bytes) => self.content(bytes),
            Token::ElemEnd(_) => self.close(),
        }
    }

    fn open(&mut self, name: &str) {
        self.field = None;
        let in_property = self.frames.iter().any(|f| matches!(f, Frame::Property(_)));
        let frame = match name {
            "layer" => Frame::Layer(LayerFrame::default()),
            "data" => Frame::Data(DataFrame::default()),
            "object" if !in_property => Frame::Object(ObjectFrame::default()),
            "property" => Frame::Property(PropertyFrame::default()),
            _ => Frame::Other,
        };
        self.frames.push(frame);
    }

    fn content(&mut self, bytes: &[u8]) {
        let Some((Frame::Data(data), rest)) = self.frames.split_last_mut() else {
            return;
        };
        let Some(Frame::Layer(layer)) = rest.last_mut() else {
            return;
        };
        layer.grid();
        if layer.skipped {
            return;
        }
        if !data.is_csv() {
            skip_encoding(layer, &data.encoding);
            return;
        }

        let grid = layer.grid();
        for &b in bytes {
            match b {
                b'0'..=b'9' if !data.cell_closed => {
                    data.value = (data.value * 10 + u64::from(b - b'0')).min(u64::from(TileId::MAX));
                    data.pending = true;
                }
                b',' => {
                    grid.commit(data.value as TileId, &mut self.stats);
                    data.value = 0;
                    data.pending = false;
                    data.cell_closed = false;
                }
                _ if data.pending => data.cell_closed = true,
                _ => {}
            }
        }
    }

    fn close(&mut self) {
        self.field = None;
        let Some(frame) = self.frames.pop() else {
            return;
        };
        match frame {
            Frame::Data(mut data) => self.close_data(&mut data),
            Frame::Layer(layer) => self.close_layer(layer),
            Frame::Object(object) => self.close_object(object),
            Frame::Property(property) => self.close_property(property),
            Frame::Other => {}
        }
    }

    fn close_data(&mut self, data: &mut DataFrame) {
        let Some(Frame::Layer(layer)) = self.frames.last_mut() else {
            tracing::warn!("tile data outside a layer, ignoring");
            return;
        };
        layer.grid();
        if layer.skipped {
            return;
        }
        if !data.is_csv() {
            skip_encoding(layer, &data.encoding);
            return;
        }
        if data.pending {
            layer.grid().commit(data.value as TileId, &mut self.stats);
        }
    }

    fn close_layer(&mut self, mut layer: LayerFrame) {
        let name = layer.name.text().into_owned();
        layer.grid();
        if layer.skipped {
            self.stats.skipped_layers += 1;
            return;
        }
        if self.layers.len() >= MAX_WORLD_LAYERS {
            self.stats.skipped_layers += 1;
            tracing::warn!(
                layer = %name,
                max = MAX_WORLD_LAYERS,
                "too many world layers, skipping"
            );
            return;
        }

        let grid = layer.grid();
        let (width, height) = (grid.width, grid.height);
        if width == 0 || height == 0 {
            self.stats.skipped_layers += 1;
            tracing::warn!(layer = %name, width, height, "layer has no cells, skipping");
            return;
        }

        match WorldLayer::from_tiles(&grid.tiles, width, height) {
            Ok(world) => {
                tracing::debug!(layer = %name, width, height, "layer parsed");
                self.layers.push(world);
                self.last_dims = Some((width, height));
            }
            Err(err) => {
                self.stats.skipped_layers += 1;
                tracing::error!(layer = %name, %err, "layer grid inconsistent, skipping");
            }
        }
    }

    /// Tile counts the current object coordinates are relative to.
    fn remap(&self) -> MapRemap {
        let open = self.frames.iter().rev().find_map(|f| match f {
            Frame::Layer(layer) => Some(layer.dims()),
            _ => None,
        });
        let (w, h) = open.or(self.last_dims).unwrap_or((1, 1));
        MapRemap::new(w.max(1), h.max(1))
    }

    fn close_object(&mut self, object: ObjectFrame) {
        let type_name = object.type_name.text().into_owned();
        if type_name.is_empty() || !self.catalog.contains_type(&type_name) {
            self.stats.skipped_objects += 1;
            tracing::warn!(type_name = %type_name, "unknown object type, skipping");
            return;
        }

        let rect = MapRect {
            x: object.x.float(),
            y: object.y.float(),
            width: object.width.float(),
            height: object.height.float(),
        };
        let (position, size) = self.remap().to_world(rect);
        let args = SpawnArgs {
            position,
            size,
            angle: object.rotation.float().to_radians(),
            visible: !(object.visible.set && object.visible.text() == "0"),
        };
        tracing::trace!(type_name = %type_name, ?position, ?size, "object parsed");
        self.objects
            .push(SpawnRequest::new(type_name, args).with_params(object.params));
    }

    fn close_property(&mut self, property: PropertyFrame) {
        let Some(object) = self.frames.iter_mut().rev().find_map(|f| match f {
            Frame::Object(object) => Some(object),
            _ => None,
        }) else {
            self.stats.dropped_properties += 1;
            tracing::warn!(
                property = %property.name.text(),
                "property outside an object, ignoring"
            );
            return;
        };

        let name = property.name.text();
        let mut chars = name.chars();
        let Some(kind) = chars.next() else {
            self.stats.dropped_properties += 1;
            tracing::warn!("property without a name, ignoring");
            return;
        };
        let key = leading_int(chars.as_str()).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        let raw = property.value.text();

        let value = match kind {
            'i' => ParamValue::Int(leading_int(&raw).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
            'u' => ParamValue::Uint(leading_int(&raw).clamp(0, i64::from(u32::MAX)) as u32),
            'f' => ParamValue::Float(leading_float(&raw)),
            's' => ParamValue::Str(clip_string(&raw, &name, &mut self.stats)),
            other => {
                tracing::warn!(
                    property = %name,
                    prefix = %other,
                    "unknown property type prefix, reading as signed int"
                );
                ParamValue::Int(leading_int(&raw).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
            }
        };
        object.params.push(key, value);
    }
}

fn skip_encoding(layer: &mut LayerFrame, encoding: &AttrBuf) {
    layer.skipped = true;
    let encoding = if encoding.set {
        encoding.text().into_owned()
    } else {
        "xml".to_owned()
    };
    tracing::warn!(
        layer = %layer.name.text(),
        encoding = %encoding,
        "unsupported layer encoding, skipping layer"
    );
}

fn clip_string(raw: &str, property: &str, stats: &mut LoadStats) -> String {
    if raw.len() <= PARAM_STRING_CAPACITY {
        return raw.to_owned();
    }
    let mut end = PARAM_STRING_CAPACITY;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    stats.truncated_values += 1;
    tracing::warn!(
        property,
        len = raw.len(),
        capacity = PARAM_STRING_CAPACITY,
        "string parameter too long, truncating"
    );
    raw[..end].to_owned()
}

/// Streaming level parser. Feed it bytes, then [`finish`](LevelLoader::finish).
pub struct LevelLoader<'c> {
    tokenizer: Tokenizer,
    machine: Machine<'c>,
}

impl<'c> LevelLoader<'c> {
    /// A loader that accepts object types known to `catalog`.
    pub fn new(catalog: &'c dyn TypeCatalog) -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            machine: Machine {
                catalog,
                frames: Vec::new(),
                field: None,
                layers: Vec::new(),
                objects: Vec::new(),
                last_dims: None,
                stats: LoadStats::default(),
            },
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        let machine = &mut self.machine;
        self.tokenizer.feed(bytes, |token| machine.on_token(token))?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<LevelData, LoadError> {
        self.tokenizer.finish()?;
        Ok(LevelData {
            layers: self.machine.layers,
            objects: self.machine.objects,
            stats: self.machine.stats,
        })
    }

    /// Stream a whole reader through the loader.
    pub fn read(mut self, mut reader: impl Read) -> Result<LevelData, LoadError> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            self.feed(&buf[..n])?;
        }
        self.finish()
    }
}

/// Parse the level file at `path`.
pub fn load_file(path: &Path, catalog: &dyn TypeCatalog) -> Result<LevelData, LoadError> {
    let _span = tracing::info_span!("load_level", path = %path.display()).entered();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let level = LevelLoader::new(catalog).read(file)?;
    tracing::info!(
        layers = level.layers.len(),
        objects = level.objects.len(),
        skipped_objects = level.stats.skipped_objects,
        skipped_layers = level.stats.skipped_layers,
        "level parsed"
    );
    Ok(level)
}

/// Parse a level held in memory.
pub fn parse_level(bytes: &[u8], catalog: &dyn TypeCatalog) -> Result<LevelData, LoadError> {
    let mut loader = LevelLoader::new(catalog);
    loader.feed(bytes)?;
    loader.finish()
}
