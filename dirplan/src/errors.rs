#[derive(Debug, Eq, PartialEq)]
pub enum OrderError {
    AncestorAfterDescendant {
        ancestor: String,
        descendant: String,
    },
}

impl std::error::Error for OrderError {}

impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OrderError::AncestorAfterDescendant {
                ancestor,
                descendant,
            } => {
                writeln!(f, "Directory order puts a child before its parent:")?;
                writeln!(f, "  {} ↖ {}", descendant, ancestor)
            }
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub struct ParseOrderingError {
    pub value: String,
}

impl std::error::Error for ParseOrderingError {}

impl std::fmt::Display for ParseOrderingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "unknown ordering '{}', expected one of: length, depth",
            self.value
        )
    }
}
