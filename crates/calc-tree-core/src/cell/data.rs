//! Cell contents

/// What a cell holds, as far as the formula engine is concerned
///
/// Text and other non-numeric cells have no representation here: whoever fills a
/// [`CellMap`](crate::CellMap) must resolve them first.
#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    /// Plain numeric value
    Number(f64),

    /// Formula text, with or without the leading `=`
    Formula(String),
}

impl CellData {
    pub fn formula<S: Into<String>>(text: S) -> Self {
        CellData::Formula(text.into())
    }

    /// Render the raw content string the tokenizer consumes
    ///
    /// Numbers become their shortest decimal text, formulas get exactly one leading `=`.
    pub fn raw_content(&self) -> String {
        match self {
            CellData::Number(n) => n.to_string(),
            CellData::Formula(text) => {
                if text.starts_with('=') {
                    text.clone()
                } else {
                    format!("={}", text)
                }
            }
        }
    }
}

impl From<f64> for CellData {
    fn from(value: f64) -> Self {
        CellData::Number(value)
    }
}
