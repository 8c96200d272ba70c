// src/detection/labels.rs

use crate::types::capitalize;

/// Class id -> damage label, as trained into the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Raw label. Ids the model list does not cover become `damage_<id>`.
    pub fn label(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("damage_{}", class_id))
    }

    /// Label for display: first letter upper case.
    pub fn display(&self, class_id: usize) -> String {
        capitalize(&self.label(class_id))
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self::new(["crack", "pothole"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_ids() {
        let names = ClassNames::default();
        assert_eq!(names.label(1), "pothole");
        assert_eq!(names.display(0), "Crack");
        assert_eq!(names.label(7), "damage_7");
        assert_eq!(names.display(7), "Damage_7");
    }
}
