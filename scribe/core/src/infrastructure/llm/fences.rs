// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Models wrap HTML in markdown code fences despite being told not to. The
// leading fence and its language tag only ever show up at the start of an
// attempt; stray fences can appear anywhere.

const FENCE: &str = "```";

/// Per-attempt fence stripping state
#[derive(Debug, Default)]
pub struct FenceStripper {
    started: bool,
}

impl FenceStripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean one fragment. Returns `None` when nothing is left to deliver.
    pub fn strip(&mut self, fragment: &str) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }

        let mut text = fragment;
        if !self.started {
            self.started = true;
            text = text.trim_start();
            if let Some(rest) = text.strip_prefix(FENCE) {
                text = rest;
                if let Some(rest) = text.strip_prefix("html") {
                    text = rest.strip_prefix('\n').unwrap_or(rest);
                }
            }
        }

        let cleaned = text.replace(FENCE, "");
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_leading_fence_and_language_tag() {
        let mut fences = FenceStripper::new();
        assert_eq!(fences.strip("  ```html\n<p>A</p>").as_deref(), Some("<p>A</p>"));
        assert_eq!(fences.strip("<p>B</p>```").as_deref(), Some("<p>B</p>"));
    }

    #[test]
    fn test_language_tag_only_stripped_on_first_fragment() {
        let mut fences = FenceStripper::new();
        assert_eq!(fences.strip("<p>").as_deref(), Some("<p>"));
        assert_eq!(fences.strip("html\n").as_deref(), Some("html\n"));
    }

    #[test]
    fn test_bare_fence_is_dropped() {
        let mut fences = FenceStripper::new();
        assert_eq!(fences.strip("```"), None);
        assert_eq!(fences.strip(""), None);
        assert_eq!(fences.strip(" <p>x</p>").as_deref(), Some(" <p>x</p>"));
    }

    #[test]
    fn test_empty_fragments_do_not_consume_first_position() {
        let mut fences = FenceStripper::new();
        assert_eq!(fences.strip(""), None);
        assert_eq!(fences.strip("```html\n<b>x</b>").as_deref(), Some("<b>x</b>"));
    }
}
