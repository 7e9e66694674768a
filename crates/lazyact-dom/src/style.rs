//! Inline style declarations

/// Ordered `property: value` list backing an element's inline style
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property; an empty value removes it, as with `style.prop = ''`
    pub fn set(&mut self, property: &str, value: &str) {
        if value.is_empty() {
            self.remove(property);
            return;
        }
        match self.declarations.iter_mut().find(|(p, _)| p == property) {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .declarations
                .push((property.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let index = self.declarations.iter().position(|(p, _)| p == property)?;
        Some(self.declarations.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize as a `style` attribute value
    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let mut style = InlineStyle::new();
        style.set("opacity", "0");
        style.set("transition", "opacity 0.3s");
        style.set("opacity", "1");
        assert_eq!(style.to_css(), "opacity: 1; transition: opacity 0.3s;");

        style.set("opacity", "");
        assert_eq!(style.get("opacity"), None);
    }
}
