//! Per-bar configuration.

use tracing::warn;

use super::state::BarState;
use crate::decor::DecoratorFn;

/// Options applied to a new bar on top of the orchestrator defaults.
///
/// ```
/// use multibar::{decor, BarOpts};
///
/// let opts = BarOpts::new()
///     .id(3)
///     .width(40)
///     .prepend(decor::static_name("fetch: ", 0, decor::SYNC_SPACE))
///     .trim_right_space();
/// # let _ = opts;
/// ```
#[derive(Default)]
pub struct BarOpts {
    id: Option<i32>,
    width: Option<usize>,
    format: Option<String>,
    prepend: Vec<DecoratorFn>,
    append: Vec<DecoratorFn>,
    trim_left_space: bool,
    trim_right_space: bool,
}

impl BarOpts {
    pub fn new() -> Self {
        BarOpts::default()
    }

    /// Sets the sort/priority key used by the default pre-render sort.
    pub fn id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the preferred bar width in character cells.
    pub fn width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets the five bar glyphs (`left`, `fill`, `tip`, `empty`, `right`),
    /// e.g. `"[=> ]"`. A custom format switches the bar from partial-cell
    /// fill to tip-replacement mode.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Appends a decorator to the left of the bar glyphs.
    pub fn prepend(mut self, decorator: DecoratorFn) -> Self {
        self.prepend.push(decorator);
        self
    }

    /// Appends a decorator to the right of the bar glyphs.
    pub fn append(mut self, decorator: DecoratorFn) -> Self {
        self.append.push(decorator);
        self
    }

    /// Drops the single space between the prepend block and the bar.
    pub fn trim_left_space(mut self) -> Self {
        self.trim_left_space = true;
        self
    }

    /// Drops the single space between the bar and the append block.
    pub fn trim_right_space(mut self) -> Self {
        self.trim_right_space = true;
        self
    }

    /// Folds `other` into `self`; scalar settings in `other` win, decorators
    /// accumulate after the ones already present.
    pub(crate) fn merge(mut self, other: BarOpts) -> Self {
        self.id = other.id.or(self.id);
        self.width = other.width.or(self.width);
        self.format = other.format.or(self.format);
        self.prepend.extend(other.prepend);
        self.append.extend(other.append);
        self.trim_left_space |= other.trim_left_space;
        self.trim_right_space |= other.trim_right_space;
        self
    }

    pub(crate) fn apply(self, state: &mut BarState) {
        if let Some(id) = self.id {
            state.id = id;
        }
        if let Some(width) = self.width {
            state.width = width;
        }
        if let Some(format) = self.format {
            if let Err(err) = state.set_format(&format, &[]) {
                warn!("ignoring bar format option: {err}");
            }
        }
        state.prepend.extend(self.prepend);
        state.append.extend(self.append);
        state.trim_left_space |= self.trim_left_space;
        state.trim_right_space |= self.trim_right_space;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn apply_overrides_defaults() {
        let mut state = BarState::new(10);
        state.width = 80;
        BarOpts::new().id(7).width(40).format("(#* )").apply(&mut state);
        assert_eq!(state.id, 7);
        assert_eq!(state.width, 40);
        assert_eq!(state.format, ['(', '#', '*', ' ', ')']);
    }

    #[test]
    fn apply_keeps_defaults_when_unset() {
        let mut state = BarState::new(10);
        state.width = 80;
        BarOpts::new().apply(&mut state);
        assert_eq!(state.width, 80);
        assert_eq!(state.format, ['[', '=', '>', ' ', ']']);
    }

    #[test]
    fn bad_format_is_ignored() {
        let mut state = BarState::new(10);
        BarOpts::new().format("##").apply(&mut state);
        assert_eq!(state.format, ['[', '=', '>', ' ', ']']);
    }

    #[test]
    fn merge_accumulates_decorators() {
        let base = BarOpts::new()
            .prepend(Arc::new(|_, _, _| "a".to_string()))
            .id(1);
        let merged = base.merge(BarOpts::new().prepend(Arc::new(|_, _, _| "b".to_string())).id(2));
        assert_eq!(merged.prepend.len(), 2);
        assert_eq!(merged.id, Some(2));
    }
}
