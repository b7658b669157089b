use crate::foundation::core::{Rgba8, Vec2};
use crate::foundation::error::{MixelError, MixelResult};

/// The value carried by a [`Parameter`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ParamValue {
    /// A scalar.
    Number(f64),
    /// An on/off switch.
    Toggle(bool),
    /// A 2D position.
    Position(Vec2),
    /// A color.
    Color(Rgba8),
}

impl ParamValue {
    /// The scalar payload, if this is a number.
    pub fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(v),
            _ => None,
        }
    }

    /// Convert a JSON value crossing the scripting boundary. Numbers,
    /// booleans, `[x, y]` pairs and `"RRGGBB"` strings are accepted.
    pub fn from_json(v: &serde_json::Value) -> MixelResult<Self> {
        if let Some(n) = v.as_f64() {
            return Ok(Self::Number(n));
        }
        if let Some(b) = v.as_bool() {
            return Ok(Self::Toggle(b));
        }
        if let Some(arr) = v.as_array()
            && arr.len() == 2
            && let (Some(x), Some(y)) = (arr[0].as_f64(), arr[1].as_f64())
        {
            return Ok(Self::Position(Vec2::new(x, y)));
        }
        if let Some(s) = v.as_str() {
            let rgb = crate::foundation::core::Rgb::from_hex(s)?;
            return Ok(Self::Color(Rgba8::opaque(rgb.r, rgb.g, rgb.b)));
        }
        Err(MixelError::param(format!(
            "cannot convert JSON value to parameter: {v}"
        )))
    }
}

/// A named, typed, boundable value exposed for external control.
///
/// Writes are clamped into the admissible range; out-of-range requests are
/// clamped, never rejected.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Parameter {
    name: String,
    value: ParamValue,
    min: f64,
    max: f64,
}

impl Parameter {
    /// A bounded scalar parameter.
    pub fn number(name: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            value: ParamValue::Number(value.clamp(min, max)),
            min,
            max,
        }
    }

    /// An unbounded (full f64 range) parameter holding any value kind.
    pub fn unbounded(name: impl Into<String>, value: ParamValue) -> Self {
        Self {
            name: name.into(),
            value,
            min: f64::MIN,
            max: f64::MAX,
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> ParamValue {
        self.value
    }

    /// Admissible range for scalar payloads.
    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Write a value, clamping scalars (and position components) into the
    /// admissible range. A mismatched value kind is a parameter error.
    pub fn set(&mut self, value: ParamValue) -> MixelResult<()> {
        let clamped = match (self.value, value) {
            (ParamValue::Number(_), ParamValue::Number(v)) => {
                ParamValue::Number(v.clamp(self.min, self.max))
            }
            (ParamValue::Position(_), ParamValue::Position(p)) => ParamValue::Position(Vec2::new(
                p.x.clamp(self.min, self.max),
                p.y.clamp(self.min, self.max),
            )),
            (ParamValue::Toggle(_), ParamValue::Toggle(b)) => ParamValue::Toggle(b),
            (ParamValue::Color(_), ParamValue::Color(c)) => ParamValue::Color(c),
            (_, other) => {
                return Err(MixelError::param(format!(
                    "parameter '{}' cannot take {:?}",
                    self.name, other
                )));
            }
        };
        self.value = clamped;
        Ok(())
    }
}

/// Ordered parameter list with stable iteration order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamSet {
    entries: Vec<Parameter>,
}

impl ParamSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter definition. Names must be unique; a duplicate
    /// replaces the existing definition in place.
    pub fn define(&mut self, param: Parameter) {
        if let Some(existing) = self.entries.iter_mut().find(|p| p.name() == param.name()) {
            *existing = param;
        } else {
            self.entries.push(param);
        }
    }

    /// Lookup by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.iter().find(|p| p.name() == name)
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.entries.iter_mut().find(|p| p.name() == name)
    }

    /// Write a value through the clamping rules of its definition.
    pub fn set(&mut self, name: &str, value: ParamValue) -> MixelResult<()> {
        self.get_mut(name)
            .ok_or_else(|| MixelError::param(format!("no parameter named '{name}'")))?
            .set(value)
    }

    /// Iterate in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.iter()
    }

    /// Number of defined parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
