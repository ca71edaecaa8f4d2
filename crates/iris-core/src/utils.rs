use crate::formatting::Markup;

// ============== Human-Readable Lists ==============

/// How [`pretty_list`] joins names.
#[derive(Clone, Copy, Debug)]
pub struct ListStyle<'a> {
    pub markup: Markup,
    pub bold: bool,
    /// Word placed before the last name; empty for none.
    pub conjunction: &'a str,
    /// Returned as-is when there are no names.
    pub empty: &'a str,
}

impl Default for ListStyle<'_> {
    fn default() -> Self {
        Self {
            markup: Markup::Markdown,
            bold: true,
            conjunction: "and",
            empty: "",
        }
    }
}

impl<'a> ListStyle<'a> {
    pub fn markup(mut self, markup: Markup) -> Self {
        self.markup = markup;
        self
    }

    pub fn plain(mut self) -> Self {
        self.bold = false;
        self
    }

    pub fn conjunction(mut self, conjunction: &'a str) -> Self {
        self.conjunction = conjunction;
        self
    }

    pub fn empty(mut self, empty: &'a str) -> Self {
        self.empty = empty;
        self
    }
}

/// `a`, `a and b`, `a, b, and c` (Oxford comma), with optional bolding.
pub fn pretty_list<S: AsRef<str>>(names: &[S], style: ListStyle<'_>) -> String {
    if names.is_empty() {
        return style.empty.to_string();
    }

    let names: Vec<String> = names
        .iter()
        .map(|n| {
            if style.bold {
                style.markup.strong(n.as_ref())
            } else {
                n.as_ref().to_string()
            }
        })
        .collect();
    let sep = if style.conjunction.is_empty() {
        String::new()
    } else {
        format!(" {}", style.conjunction)
    };

    match names.as_slice() {
        [only] => only.clone(),
        [a, b] => format!("{a}{sep} {b}"),
        [init @ .., last] => format!("{},{sep} {last}", init.join(", ")),
        [] => style.empty.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bolds_and_joins() {
        assert_eq!(pretty_list(&["a"], ListStyle::default()), "**a**");
        assert_eq!(
            pretty_list(&["a", "b"], ListStyle::default()),
            "**a** and **b**"
        );
        assert_eq!(
            pretty_list(&["a", "b", "c"], ListStyle::default()),
            "**a**, **b**, and **c**"
        );
    }

    #[test]
    fn plain_with_other_conjunction() {
        let style = ListStyle::default().plain().conjunction("or");
        assert_eq!(pretty_list(&["x", "y"], style), "x or y");
        assert_eq!(pretty_list(&["x", "y", "z"], style), "x, y, or z");
    }

    #[test]
    fn no_conjunction() {
        let style = ListStyle::default().plain().conjunction("");
        assert_eq!(pretty_list(&["x", "y"], style), "x y");
        assert_eq!(pretty_list(&["x", "y", "z"], style), "x, y, z");
    }

    #[test]
    fn empty_list_uses_placeholder() {
        let names: [&str; 0] = [];
        assert_eq!(pretty_list(&names, ListStyle::default()), "");
        assert_eq!(
            pretty_list(&names, ListStyle::default().empty("none")),
            "none"
        );
    }

    #[test]
    fn html_bold() {
        let style = ListStyle::default().markup(Markup::Html);
        assert_eq!(pretty_list(&["a&b"], style), "<b>a&amp;b</b>");
    }
}
