//! Which classes a session rewrites.

use std::{fmt, sync::Arc};

/// Predicate over internal class names deciding whether a class is rewritten at all.
///
/// The default accepts every class. Classes that are filtered out are returned untouched.
///
/// # Examples
///
/// ```rust
/// use classremap::rewriter::ClassFilter;
///
/// let filter = ClassFilter::Prefix("app/".into());
/// assert!(filter.matches("app/MainActivity"));
/// assert!(!filter.matches("lib/R"));
///
/// let filter = ClassFilter::custom(|name| !name.contains("/R$"));
/// assert!(!filter.matches("lib/R$id"));
/// ```
#[derive(Clone, Default)]
pub enum ClassFilter {
    /// Every class
    #[default]
    All,
    /// Classes whose internal name starts with the given text
    Prefix(String),
    /// Classes whose internal name ends with the given text
    Suffix(String),
    /// A host supplied predicate
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl ClassFilter {
    /// Wrap a closure.
    pub fn custom(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        ClassFilter::Custom(Arc::new(predicate))
    }

    /// `true` if `class_name` should be rewritten.
    #[must_use]
    pub fn matches(&self, class_name: &str) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Prefix(prefix) => class_name.starts_with(prefix.as_str()),
            ClassFilter::Suffix(suffix) => class_name.ends_with(suffix.as_str()),
            ClassFilter::Custom(predicate) => predicate(class_name),
        }
    }
}

impl fmt::Debug for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassFilter::All => write!(f, "All"),
            ClassFilter::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            ClassFilter::Suffix(suffix) => f.debug_tuple("Suffix").field(suffix).finish(),
            ClassFilter::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
