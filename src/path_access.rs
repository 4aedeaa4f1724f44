use serde_json::{Map, Value};

/// Reads and writes values nested inside a JSON document using
/// slash-delimited paths such as `taskDefinition/taskDefinitionArn`.
///
/// Segments address object keys. A segment that parses as an index also
/// addresses an element of an array.
#[derive(Debug, Clone, PartialEq)]
pub struct PathAccess {
    descriptor: Value,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PathError {
    #[error("element {0} does not exist")]
    NotFound(String),
    #[error("element {0} is not a mapping")]
    NotAMapping(String),
}

impl PathAccess {
    pub fn new(descriptor: Value) -> Self {
        Self { descriptor }
    }

    pub fn into_inner(self) -> Value {
        self.descriptor
    }

    /// Returns `None` as soon as a segment is missing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .try_fold(&self.descriptor, |element, segment| child(element, segment))
    }

    /// Assigns `value` at `path`, overwriting whatever was there.
    ///
    /// Missing intermediate segments are created as empty mappings when
    /// `create` is set, otherwise the first missing one is reported.
    pub fn set(&mut self, path: &str, value: Value, create: bool) -> Result<(), PathError> {
        let mut segments: Vec<&str> = path.split('/').collect();
        let last = segments.pop().unwrap_or_default();

        let mut element = &mut self.descriptor;
        let mut parent = "";
        for segment in segments {
            element = match element {
                Value::Object(map) => {
                    if !map.contains_key(segment) {
                        if !create {
                            return Err(PathError::NotFound(segment.to_owned()));
                        }
                        map.insert(segment.to_owned(), Value::Object(Map::new()));
                    }
                    map.get_mut(segment)
                        .ok_or_else(|| PathError::NotFound(segment.to_owned()))?
                }
                Value::Array(items) => index(segment)
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| PathError::NotFound(segment.to_owned()))?,
                _ => return Err(PathError::NotAMapping(parent.to_owned())),
            };
            parent = segment;
        }

        match element {
            Value::Object(map) => {
                map.insert(last.to_owned(), value);
                Ok(())
            }
            Value::Array(items) => {
                let slot = index(last)
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| PathError::NotFound(last.to_owned()))?;
                *slot = value;
                Ok(())
            }
            _ => Err(PathError::NotAMapping(parent.to_owned())),
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

impl From<Value> for PathAccess {
    fn from(descriptor: Value) -> Self {
        Self::new(descriptor)
    }
}

fn child<'a>(element: &'a Value, segment: &str) -> Option<&'a Value> {
    match element {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => index(segment).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn index(segment: &str) -> Option<usize> {
    segment.parse().ok()
}
