use std::fmt;

/// A view type that can be recycled through a [`ReusePool`](crate::ReusePool).
///
/// The default identifier is the type's name without module paths, so
/// `my_app::feed::PostCell` is registered as `"PostCell"`.
pub trait ViewReusable: 'static {
    fn reuse_identifier() -> String
    where
        Self: Sized,
    {
        short_type_name::<Self>()
    }

    /// Reset per-item state before the instance is handed out again.
    fn prepare_for_reuse(&mut self) {}
}

/// `std::any::type_name` with every module path stripped, including those
/// inside generic arguments.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut start = 0;
    for (i, c) in full.char_indices() {
        if matches!(c, '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';') {
            out.push_str(strip_path(&full[start..i]));
            out.push(c);
            start = i + c.len_utf8();
        }
    }
    out.push_str(strip_path(&full[start..]));
    out
}

fn strip_path(segment: &str) -> &str {
    segment.rsplit("::").next().unwrap_or(segment)
}

/// Role a reusable view plays in a list or grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Cell,
    SectionHeader,
    SectionFooter,
    /// Any other supplementary view, named by the layout.
    Supplementary(String),
}

impl ElementKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Cell => "cell",
            Self::SectionHeader => "section-header",
            Self::SectionFooter => "section-footer",
            Self::Supplementary(name) => name,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
