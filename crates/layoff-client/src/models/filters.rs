use crate::gateway::QueryParams;

/// An optional-field predicate. A `None` field means no constraint.
pub trait FilterSet: Clone + Default {
    /// Field-wise override: fields set in `patch` replace ours, the rest stay.
    fn merge(&mut self, patch: Self);

    /// Number of fields that constrain the query.
    fn active_count(&self) -> usize;

    /// Appends the set fields to `query`; unset fields are never sent.
    fn append_query(&self, query: &mut QueryParams);

    fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        self.append_query(&mut query);
        query
    }
}

/// `target = patch` when `patch` is set.
pub(crate) fn overlay<T>(target: &mut Option<T>, patch: Option<T>) {
    if patch.is_some() {
        *target = patch;
    }
}

/// Like [`overlay`], but a blank patch clears the field.
pub(crate) fn overlay_text(target: &mut Option<String>, patch: Option<String>) {
    if let Some(text) = patch {
        *target = non_blank(Some(text.as_str())).map(str::to_string);
    }
}

/// `None` for absent or whitespace-only text.
pub(crate) fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_patch_clears_text() {
        let mut field = Some("rust".to_string());
        overlay_text(&mut field, None);
        assert_eq!(field.as_deref(), Some("rust"));

        overlay_text(&mut field, Some("  ".to_string()));
        assert_eq!(field, None);

        overlay_text(&mut field, Some("go".to_string()));
        assert_eq!(field.as_deref(), Some("go"));
    }
}
