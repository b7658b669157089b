//! Scripting-facing operations.
//!
//! A scripting engine drives the mix through named operations that always
//! carry an explicit [`Context`]; there is no ambient "current context".
//! Objects that exist before they join a context (a constructed layer, a
//! filter waiting to be attached) live in a [`HandleRegistry`] under
//! opaque handles, tagged by kind and capability-checked at every use
//! instead of being cast from raw pointers.

use crate::context::Context;
use crate::filter::{Filter, create_filter};
use crate::foundation::error::{MixelError, MixelResult};
use crate::layer::{Layer, create_layer};
use crate::param::ParamValue;
use std::collections::HashMap;

/// Opaque reference to a registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(u64);

enum Entry {
    Layer(Layer),
    Filter(Box<dyn Filter>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Entry::Layer(_) => "layer",
            Entry::Filter(_) => "filter",
        }
    }
}

/// Typed registry mapping opaque handles to tagged engine objects.
#[derive(Default)]
pub struct HandleRegistry {
    next: u64,
    entries: HashMap<u64, Entry>,
}

impl HandleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: Entry) -> Handle {
        let id = self.next;
        self.next += 1;
        self.entries.insert(id, entry);
        Handle(id)
    }

    /// Construct a layer from a descriptor (source type detected, source
    /// opened) and park it under a handle until `add_layer`.
    pub fn new_layer(&mut self, descriptor: &str) -> MixelResult<Handle> {
        let layer = create_layer(descriptor)?;
        Ok(self.insert(Entry::Layer(layer)))
    }

    /// Park an externally built layer (custom source) under a handle.
    pub fn register_layer(&mut self, layer: Layer) -> Handle {
        self.insert(Entry::Layer(layer))
    }

    /// Construct a filter by kind name with JSON parameters and park it
    /// under a handle until `add_filter`.
    pub fn new_filter(&mut self, kind: &str, params: &serde_json::Value) -> MixelResult<Handle> {
        let filter = create_filter(kind, params)?;
        Ok(self.insert(Entry::Filter(filter)))
    }

    /// Drop a parked entry. Returns whether the handle was live. A parked
    /// layer is closed on the way out.
    pub fn discard(&mut self, handle: Handle) -> bool {
        match self.entries.remove(&handle.0) {
            Some(Entry::Layer(mut layer)) => {
                layer.close();
                true
            }
            Some(Entry::Filter(_)) => true,
            None => false,
        }
    }

    fn take_layer(&mut self, handle: Handle) -> MixelResult<Layer> {
        match self.entries.remove(&handle.0) {
            Some(Entry::Layer(layer)) => Ok(layer),
            Some(other) => {
                let kind = other.kind();
                self.entries.insert(handle.0, other);
                Err(MixelError::param(format!(
                    "handle {} is a {kind}, not a layer",
                    handle.0
                )))
            }
            None => Err(MixelError::param(format!("unknown handle {}", handle.0))),
        }
    }

    fn take_filter(&mut self, handle: Handle) -> MixelResult<Box<dyn Filter>> {
        match self.entries.remove(&handle.0) {
            Some(Entry::Filter(filter)) => Ok(filter),
            Some(other) => {
                let kind = other.kind();
                self.entries.insert(handle.0, other);
                Err(MixelError::param(format!(
                    "handle {} is a {kind}, not a filter",
                    handle.0
                )))
            }
            None => Err(MixelError::param(format!("unknown handle {}", handle.0))),
        }
    }

    /// Move a parked layer into the context's mix. On success the handle
    /// is spent and the layer's final name is returned; on init failure
    /// the layer is closed and the handle is spent as well, so the caller
    /// decides whether to construct a fresh one and retry.
    pub fn add_layer(&mut self, ctx: &mut Context, handle: Handle) -> MixelResult<String> {
        let layer = self.take_layer(handle)?;
        ctx.add_layer(layer)
    }

    /// Append a parked filter to a layer's chain. The handle is spent on
    /// success and kept on a bad layer name.
    pub fn add_filter(
        &mut self,
        ctx: &mut Context,
        layer_name: &str,
        handle: Handle,
    ) -> MixelResult<()> {
        if ctx.layer(layer_name).is_none() {
            return Err(MixelError::param(format!("no layer named '{layer_name}'")));
        }
        let filter = self.take_filter(handle)?;
        // Checked just above; the unwrap-free double lookup keeps the
        // handle alive when the layer is missing.
        if let Some(layer) = ctx.layer_mut(layer_name) {
            layer.add_filter(filter);
        }
        Ok(())
    }
}

/// Remove all filters with a given name from a layer's chain.
pub fn remove_filter(ctx: &mut Context, layer_name: &str, filter: &str) -> MixelResult<bool> {
    Ok(layer_mut(ctx, layer_name)?.remove_filter(filter))
}

/// Append an automation to a layer's chain.
pub fn add_automation(
    ctx: &mut Context,
    layer_name: &str,
    automation: crate::animation::Automation,
) -> MixelResult<()> {
    layer_mut(ctx, layer_name)?.add_automation(automation);
    Ok(())
}

/// Write a layer parameter from a JSON value crossing the boundary.
pub fn set_parameter(
    ctx: &mut Context,
    layer_name: &str,
    param: &str,
    value: &serde_json::Value,
) -> MixelResult<()> {
    let value = ParamValue::from_json(value)?;
    layer_mut(ctx, layer_name)?.set_parameter(param, value)
}

/// Read a layer parameter.
pub fn get_parameter(
    ctx: &Context,
    layer_name: &str,
    param: &str,
) -> MixelResult<Option<ParamValue>> {
    Ok(layer_ref(ctx, layer_name)?.get_parameter(param))
}

/// Select a layer's blend mode by name; an unknown name leaves the
/// previous mode active.
pub fn set_blit(ctx: &mut Context, layer_name: &str, mode: &str) -> MixelResult<()> {
    layer_mut(ctx, layer_name)?.set_blit(mode)
}

/// Name of a layer's active blend mode.
pub fn get_blit(ctx: &Context, layer_name: &str) -> MixelResult<&'static str> {
    Ok(layer_ref(ctx, layer_name)?.get_blit())
}

/// Resume (and reactivate) a layer.
pub fn start_layer(ctx: &mut Context, layer_name: &str) -> MixelResult<()> {
    layer_mut(ctx, layer_name)?.start();
    Ok(())
}

/// Pause a layer; its last frame keeps compositing.
pub fn pause_layer(ctx: &mut Context, layer_name: &str) -> MixelResult<()> {
    layer_mut(ctx, layer_name)?.pause();
    Ok(())
}

/// Close a layer and take it out of the mix. Detaches from compositing
/// first, then stops the worker (join-before-free).
pub fn close_layer(ctx: &mut Context, layer_name: &str) -> MixelResult<()> {
    ctx.rem_layer(layer_name)
}

/// Hide or show a layer without touching its worker.
pub fn hide_layer(ctx: &mut Context, layer_name: &str, hidden: bool) -> MixelResult<()> {
    layer_mut(ctx, layer_name)?.set_hidden(hidden);
    Ok(())
}

fn layer_ref<'c>(ctx: &'c Context, name: &str) -> MixelResult<&'c Layer> {
    ctx.layer(name)
        .ok_or_else(|| MixelError::param(format!("no layer named '{name}'")))
}

fn layer_mut<'c>(ctx: &'c mut Context, name: &str) -> MixelResult<&'c mut Layer> {
    ctx.layer_mut(name)
        .ok_or_else(|| MixelError::param(format!("no layer named '{name}'")))
}
