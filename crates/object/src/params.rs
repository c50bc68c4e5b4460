use serde::{Deserialize, Serialize};

/// Longest string parameter value, in bytes. Longer values are truncated by the loader.
pub const PARAM_STRING_CAPACITY: usize = 64;

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i32),
    Uint(u32),
    Float(f32),
    Str(String),
}

impl ParamValue {
    /// Type prefix used in level property names (`i`, `u`, `f`, `s`).
    pub fn prefix(&self) -> char {
        match self {
            Self::Int(_) => 'i',
            Self::Uint(_) => 'u',
            Self::Float(_) => 'f',
            Self::Str(_) => 's',
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

/// One keyed parameter handed to an object constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectParam {
    pub key: i32,
    pub value: ParamValue,
}

impl ObjectParam {
    /// Property name as written in a level file, e.g. `i5` or `s12`.
    pub fn property_name(&self) -> String {
        format!("{}{}", self.value.prefix(), self.key)
    }
}

/// Parameter list for one object, in document order.
///
/// Keyed getters return the last occurrence of a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectParams {
    params: Vec<ObjectParam>,
}

impl ObjectParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: i32, value: ParamValue) {
        self.params.push(ObjectParam { key, value });
    }

    pub fn with(mut self, key: i32, value: ParamValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObjectParam> {
        self.params.iter()
    }

    pub fn get(&self, key: i32) -> Option<&ParamValue> {
        self.params
            .iter()
            .rev()
            .find(|p| p.key == key)
            .map(|p| &p.value)
    }

    pub fn int(&self, key: i32) -> Option<i32> {
        match self.get(key)? {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn uint(&self, key: i32) -> Option<u32> {
        match self.get(key)? {
            ParamValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, key: i32) -> Option<f32> {
        match self.get(key)? {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self, key: i32) -> Option<&str> {
        match self.get(key)? {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl FromIterator<ObjectParam> for ObjectParams {
    fn from_iter<I: IntoIterator<Item = ObjectParam>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ObjectParams {
    type Item = ObjectParam;
    type IntoIter = std::vec::IntoIter<ObjectParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.into_iter()
    }
}

impl<'a> IntoIterator for &'a ObjectParams {
    type Item = &'a ObjectParam;
    type IntoIter = std::slice::Iter<'a, ObjectParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters() {
        let params = ObjectParams::new()
            .with(1, ParamValue::Int(-3))
            .with(2, ParamValue::Uint(7))
            .with(3, ParamValue::Float(0.5))
            .with(4, ParamValue::Str("door".into()));

        assert_eq!(params.int(1), Some(-3));
        assert_eq!(params.uint(2), Some(7));
        assert_eq!(params.float(3), Some(0.5));
        assert_eq!(params.string(4), Some("door"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn getter_with_wrong_kind_is_none() {
        let params = ObjectParams::new().with(1, ParamValue::Float(1.0));
        assert_eq!(params.int(1), None);
        assert_eq!(params.int(9), None);
    }

    #[test]
    fn duplicate_keys_resolve_to_last_occurrence() {
        let params = ObjectParams::new()
            .with(5, ParamValue::Int(1))
            .with(5, ParamValue::Int(2));
        assert_eq!(params.int(5), Some(2));
        let keys: Vec<_> = params.iter().map(|p| p.value.clone()).collect();
        assert_eq!(keys, vec![ParamValue::Int(1), ParamValue::Int(2)]);
    }

    #[test]
    fn property_name_round_trips_prefix_and_key() {
        let param = ObjectParam {
            key: 12,
            value: ParamValue::Str("x".into()),
        };
        assert_eq!(param.property_name(), "s12");
        assert_eq!(ParamValue::Uint(3).prefix(), 'u');
    }
}
