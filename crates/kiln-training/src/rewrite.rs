//! Rewrites solver and network configurations so they point at the files
//! laid out in the work directory (see [`WorkLayout`]).
//!
//! Only the fields named here are touched; everything else in the document
//! is written back exactly as parsed.
//!
//! [`WorkLayout`]: crate::layout::WorkLayout

use crate::error::{PrepError, PrepResult};
use crate::layout::{SNAPSHOT_PREFIX, SOLVER_NET_FILE, Split};
use kiln_prototxt::{Message, ParseError, Scalar, ScalarKind, Value};

/// Point `net` at the rewritten network file and `snapshot_prefix` at the
/// work directory.
pub fn rewrite_solver_config(solver: &mut Message) {
    solver.set("net", Scalar::string(SOLVER_NET_FILE));
    solver.set("snapshot_prefix", Scalar::string(SNAPSHOT_PREFIX));
}

/// Input layer types whose `source` is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Reads images listed in a manifest (`IMAGE_DATA` / `"ImageData"`).
    ImageData,
    /// Reads a raw data directory (`DATA` / `"Data"`).
    Data,
    Other,
}

impl LayerKind {
    #[must_use]
    pub fn of(layer: &Message) -> Self {
        let Some(tag) = layer.get("type").and_then(Value::as_scalar) else {
            return Self::Other;
        };
        let name = match tag.kind() {
            ScalarKind::String => tag.as_str().unwrap_or_default(),
            _ => tag.raw().to_string(),
        };
        match name.as_str() {
            "IMAGE_DATA" | "ImageData" => Self::ImageData,
            "DATA" | "Data" => Self::Data,
            _ => Self::Other,
        }
    }

    fn param_block(self) -> Option<&'static str> {
        match self {
            Self::ImageData => Some("image_data_param"),
            Self::Data => Some("data_param"),
            Self::Other => None,
        }
    }

    fn source_for(self, split: Split) -> &'static str {
        match self {
            Self::ImageData => split.index_name(),
            Self::Data | Self::Other => split.dir_name(),
        }
    }
}

/// Whether any `include { phase: ... }` block of `layer` names `split`.
#[must_use]
pub fn is_in_phase(layer: &Message, split: Split) -> bool {
    let wanted = match split {
        Split::Training => ("TRAIN", "0"),
        Split::Testing => ("TEST", "1"),
    };
    layer
        .messages_named("include")
        .filter_map(|include| include.get("phase").and_then(Value::as_scalar))
        .any(|phase| phase.raw() == wanted.0 || phase.raw() == wanted.1)
}

/// Point the `source` of every image/data input layer at the manifest or
/// directory of the phase it is included in.
///
/// Both legacy `layers` and current `layer` blocks are visited in document
/// order. Layers in no phase, and layers of any other type, are left as is.
/// A layer included in both phases gets the training source and then the
/// testing source; the testing one wins. Returns how many layers changed.
pub fn rewrite_network_config(net: &mut Message) -> usize {
    let mut rewritten = 0;
    for field in net.fields_mut().iter_mut().filter(|f| f.name == "layer" || f.name == "layers") {
        let Value::Message(layer) = &mut field.value else {
            continue;
        };
        let kind = LayerKind::of(layer);
        let Some(block) = kind.param_block() else {
            continue;
        };
        let mut touched = false;
        for split in Split::ALL {
            if is_in_phase(layer, split) {
                layer.message_mut_or_insert(block).set("source", Scalar::string(kind.source_for(split)));
                touched = true;
            }
        }
        if touched {
            rewritten += 1;
        }
    }
    rewritten
}

fn parse(reference: &str, source: &[u8]) -> PrepResult<Message> {
    let text = std::str::from_utf8(source).map_err(|e| PrepError::ConfigParse {
        reference: reference.to_string(),
        source: ParseError { line: 1, column: 1, message: format!("not valid UTF-8: {e}") },
    })?;
    kiln_prototxt::parse(text).map_err(|source| PrepError::ConfigParse { reference: reference.to_string(), source })
}

/// Parse, rewrite and re-serialize a solver configuration fetched from `reference`.
pub fn rewrite_solver_bytes(reference: &str, source: &[u8]) -> PrepResult<Vec<u8>> {
    let mut solver = parse(reference, source)?;
    rewrite_solver_config(&mut solver);
    Ok(solver.to_string().into_bytes())
}

/// Parse, rewrite and re-serialize a network configuration fetched from `reference`.
pub fn rewrite_network_bytes(reference: &str, source: &[u8]) -> PrepResult<Vec<u8>> {
    let mut net = parse(reference, source)?;
    let rewritten = rewrite_network_config(&mut net);
    tracing::debug!(reference, rewritten, "rewrote network input layers");
    Ok(net.to_string().into_bytes())
}
