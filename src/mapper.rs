use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A real function of one variable that can be sampled into a point set.
pub trait MathFunction: Send + Sync {
    fn apply(&self, x: f64) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SqrFunction;

#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityFunction;

#[derive(Clone, Copy, Debug, Default)]
pub struct SinFunction;

#[derive(Clone, Copy, Debug, Default)]
pub struct CosFunction;

#[derive(Clone, Copy, Debug, Default)]
pub struct ExpFunction;

impl MathFunction for SqrFunction {
    fn apply(&self, x: f64) -> f64 {
        x * x
    }
}

impl MathFunction for IdentityFunction {
    fn apply(&self, x: f64) -> f64 {
        x
    }
}

impl MathFunction for SinFunction {
    fn apply(&self, x: f64) -> f64 {
        x.sin()
    }
}

impl MathFunction for CosFunction {
    fn apply(&self, x: f64) -> f64 {
        x.cos()
    }
}

impl MathFunction for ExpFunction {
    fn apply(&self, x: f64) -> f64 {
        x.exp()
    }
}

/// Wraps a closure as a [`MathFunction`].
pub struct FnFunction<F>(pub F);

impl<F> MathFunction for FnFunction<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn apply(&self, x: f64) -> f64 {
        (self.0)(x)
    }
}

/// Descriptive data shown next to a function in a picker.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct MathFunctionInfo {
    pub key: String,
    pub label: String,
    pub description: String,
    pub example: String,
    pub category: String,
    pub function_type: String,
}

impl MathFunctionInfo {
    pub fn new(
        key: &str,
        label: &str,
        description: &str,
        example: &str,
        category: &str,
        function_type: &str,
    ) -> Self {
        MathFunctionInfo {
            key: key.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            example: example.to_string(),
            category: category.to_string(),
            function_type: function_type.to_string(),
        }
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.label.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.example.to_lowercase().contains(&query)
    }
}

struct MapperEntry {
    function: Arc<dyn MathFunction>,
    info: Option<MathFunctionInfo>,
}

/// Two-way registry between display names and math function instances.
///
/// Each owner builds its own mapper and passes it where it is needed; there is
/// no process-wide instance.
#[derive(Default)]
pub struct MathFunctionMapper {
    entries: BTreeMap<String, MapperEntry>,
}

impl fmt::Debug for MathFunctionMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathFunctionMapper")
            .field("names", &self.names())
            .finish()
    }
}

impl MathFunctionMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper preloaded with the square, identity, sine, cosine and exponent functions.
    pub fn with_defaults() -> Self {
        let mut mapper = Self::new();
        mapper.add_mapping(
            "Square function",
            Arc::new(SqrFunction),
            Some(MathFunctionInfo::new(
                "sqr",
                "Square function",
                "The function y = x²",
                "f(x) = x²",
                "algebraic",
                "SqrFunction",
            )),
        );
        mapper.add_mapping(
            "Identity function",
            Arc::new(IdentityFunction),
            Some(MathFunctionInfo::new(
                "identity",
                "Identity function",
                "The function y = x",
                "f(x) = x",
                "algebraic",
                "IdentityFunction",
            )),
        );
        mapper.add_mapping(
            "Sine",
            Arc::new(SinFunction),
            Some(MathFunctionInfo::new(
                "sin",
                "Sine",
                "Trigonometric sine function",
                "f(x) = sin(x)",
                "trigonometric",
                "SinFunction",
            )),
        );
        mapper.add_mapping(
            "Cosine",
            Arc::new(CosFunction),
            Some(MathFunctionInfo::new(
                "cos",
                "Cosine",
                "Trigonometric cosine function",
                "f(x) = cos(x)",
                "trigonometric",
                "CosFunction",
            )),
        );
        mapper.add_mapping(
            "Exponent",
            Arc::new(ExpFunction),
            Some(MathFunctionInfo::new(
                "exp",
                "Exponent",
                "Exponential function",
                "f(x) = e^x",
                "exponential",
                "ExpFunction",
            )),
        );
        mapper
    }

    pub fn from_entries(
        entries: impl IntoIterator<
            Item = (String, Arc<dyn MathFunction>, Option<MathFunctionInfo>),
        >,
    ) -> Self {
        let mut mapper = Self::new();
        for (name, function, info) in entries {
            mapper.add_mapping(&name, function, info);
        }
        mapper
    }

    /// Registers `function` under `name`, replacing any previous entry of that name.
    pub fn add_mapping(
        &mut self,
        name: &str,
        function: Arc<dyn MathFunction>,
        info: Option<MathFunctionInfo>,
    ) {
        self.entries
            .insert(name.to_string(), MapperEntry { function, info });
    }

    pub fn function_by_name(&self, name: &str) -> Option<Arc<dyn MathFunction>> {
        self.entries.get(name).map(|e| Arc::clone(&e.function))
    }

    /// Reverse lookup by instance identity.
    pub fn name_of(&self, function: &Arc<dyn MathFunction>) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| Arc::ptr_eq(&e.function, function))
            .map(|(name, _)| name.as_str())
    }

    pub fn name_by_key(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| e.info.as_ref().is_some_and(|i| i.key == key))
            .map(|(name, _)| name.as_str())
    }

    pub fn info(&self, name: &str) -> Option<&MathFunctionInfo> {
        self.entries.get(name).and_then(|e| e.info.as_ref())
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn functions(&self) -> Vec<Arc<dyn MathFunction>> {
        self.entries.values().map(|e| Arc::clone(&e.function)).collect()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove_function(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct categories of the described functions, sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .entries
            .values()
            .filter_map(|e| e.info.as_ref().map(|i| i.category.clone()))
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Descriptions matching a category (`None` or `"all"` for any) and a
    /// case-insensitive query over label, description and example.
    pub fn search(&self, category: Option<&str>, query: &str) -> Vec<&MathFunctionInfo> {
        self.entries
            .values()
            .filter_map(|e| e.info.as_ref())
            .filter(|info| match category {
                None | Some("all") => true,
                Some(c) => info.category == c,
            })
            .filter(|info| query.is_empty() || info.matches(query))
            .collect()
    }
}
