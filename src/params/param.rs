use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Number,
    Choice,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::Number => "NUMBER",
            ParamType::Choice => "CHOICE",
        }
    }
}

/// One engine parameter as listed by `list_params`.
///
/// `name` is the display name and gets rewritten while the tree is built;
/// `reference` is the full original name used on the wire and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub reference: String,
    pub kind: ParamType,
    /// For `Choice`, the index of the selected entry in `choices`.
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
    pub choices: Vec<String>,
    pub desc: String,
}

impl Parameter {
    /// Parse one `list_params` record:
    ///
    /// - `name,value,NUMBER,min,max,step,description`
    /// - `name,label(index),CHOICE,a;b;c,description`
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 3 {
            return Err(malformed(line, "expected at least 3 fields"));
        }
        let name = fields[0].to_string();

        match fields[2] {
            "NUMBER" => {
                if fields.len() < 7 {
                    return Err(malformed(line, "NUMBER needs min, max, step and description"));
                }
                let number = |idx: usize, what: &str| -> Result<f64> {
                    fields[idx]
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .ok_or_else(|| malformed(line, &format!("bad {what} '{}'", fields[idx])))
                };
                let mut param = Parameter {
                    reference: name.clone(),
                    name,
                    kind: ParamType::Number,
                    value: number(1, "value")?,
                    min_value: number(3, "min")?,
                    max_value: number(4, "max")?,
                    step: number(5, "step")?,
                    choices: Vec::new(),
                    desc: fields[6..].join(","),
                };
                if param.min_value > param.max_value {
                    return Err(malformed(line, "min is greater than max"));
                }
                param.clamp();
                Ok(param)
            }
            "CHOICE" => {
                if fields.len() < 5 {
                    return Err(malformed(line, "CHOICE needs choices and description"));
                }
                let index = parse_choice_value(fields[1])
                    .ok_or_else(|| malformed(line, &format!("bad choice '{}'", fields[1])))?;
                let choices: Vec<String> = fields[3].split(';').map(str::to_string).collect();
                let mut param = Parameter {
                    reference: name.clone(),
                    name,
                    kind: ParamType::Choice,
                    value: index as f64,
                    min_value: 0.0,
                    max_value: (choices.len() - 1) as f64,
                    step: 1.0,
                    choices,
                    desc: fields[4..].join(","),
                };
                param.clamp();
                Ok(param)
            }
            other => Err(Error::UnsupportedParameterType {
                line: line.to_string(),
                kind: other.to_string(),
            }),
        }
    }

    /// Move the value by `amount` steps, clamped to the parameter range.
    pub fn adjust(&mut self, amount: f64) {
        self.value += self.step * amount;
        self.clamp();
    }

    fn clamp(&mut self) {
        self.value = self.value.clamp(self.min_value, self.max_value);
    }

    /// Label of the selected choice, if this is a `Choice` parameter.
    pub fn choice_label(&self) -> Option<&str> {
        match self.kind {
            ParamType::Choice => self.choices.get(self.value as usize).map(String::as_str),
            ParamType::Number => None,
        }
    }

    /// Value as shown next to the parameter name.
    pub fn display_value(&self) -> String {
        match self.choice_label() {
            Some(label) => label.to_string(),
            None => format!("{:+7.3}", self.value),
        }
    }

    /// Position of the value within its range, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        let span = self.max_value - self.min_value;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value - self.min_value) / span).clamp(0.0, 1.0)
    }

    /// The `set_param` command that pushes the current value to the engine.
    pub fn set_command(&self) -> String {
        format!("set_param {} {}", self.reference, self.value)
    }
}

/// Wire encoding, the inverse of [`Parameter::parse`].
impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamType::Number => write!(
                f,
                "{},{},{},{},{},{},{}",
                self.reference,
                self.value,
                self.kind.as_str(),
                self.min_value,
                self.max_value,
                self.step,
                self.desc
            ),
            ParamType::Choice => write!(
                f,
                "{},{}({}),{},{},{}",
                self.reference,
                self.choice_label().unwrap_or(""),
                self.value as usize,
                self.kind.as_str(),
                self.choices.join(";"),
                self.desc
            ),
        }
    }
}

/// Parse `label(index)`. The label must be non-empty and free of `(`, `)` and `^`.
fn parse_choice_value(field: &str) -> Option<usize> {
    let inner = field.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let (label, digits) = (&inner[..open], &inner[open + 1..]);
    if label.is_empty() || label.contains(['(', ')', '^']) {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn malformed(line: &str, reason: &str) -> Error {
    Error::MalformedParameter {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}
