/*!
 * GNU gettext PO adapter.
 *
 * Supports contexts, plural forms, fuzzy flags, source references,
 * extracted comments and previous msgids. Obsolete (`#~`) entries are
 * skipped and the header entry is reported as not translatable.
 */

use crate::errors::FormatError;
use crate::util::join_plural;

use super::TranslatableUnit;

/// Parsed PO entry
#[derive(Debug, Clone, Default)]
pub struct PoUnit {
    /// msgctxt
    pub msgctxt: String,
    /// msgid
    pub msgid: String,
    /// msgid_plural, if any
    pub msgid_plural: Option<String>,
    /// msgstr or msgstr[n] values
    pub msgstr: Vec<String>,
    /// `#:` references
    pub locations: Vec<String>,
    /// `#,` flags
    pub flags: Vec<String>,
    /// `#.` comments
    pub extracted_comments: Vec<String>,
    /// `#|` msgid
    pub previous_msgid: String,

    source: String,
    target: String,
    location: String,
    comment: String,
    flag_text: String,
}

impl PoUnit {
    fn finalize(mut self) -> Self {
        let mut sources = vec![self.msgid.clone()];
        if let Some(plural) = &self.msgid_plural {
            sources.push(plural.clone());
        }
        self.source = join_plural(&sources);
        self.target = join_plural(&self.msgstr);
        self.location = self.locations.join(", ");
        self.comment = self.extracted_comments.join("\n");
        self.flag_text = self
            .flags
            .iter()
            .filter(|f| f.as_str() != "fuzzy")
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        self
    }

    /// Header entry carrying file metadata
    pub fn is_header(&self) -> bool {
        self.msgid.is_empty() && self.msgctxt.is_empty()
    }
}

impl TranslatableUnit for PoUnit {
    fn source(&self) -> &str {
        &self.source
    }

    fn target(&self) -> &str {
        &self.target
    }

    fn context(&self) -> &str {
        &self.msgctxt
    }

    fn is_translatable(&self) -> bool {
        !self.is_header()
    }

    fn is_translated(&self) -> bool {
        !self.msgstr.is_empty() && self.msgstr.iter().all(|s| !s.is_empty()) && !self.is_fuzzy()
    }

    fn is_fuzzy(&self) -> bool {
        self.flags.iter().any(|f| f == "fuzzy")
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn comment(&self) -> &str {
        &self.comment
    }

    fn flags(&self) -> &str {
        &self.flag_text
    }

    fn previous_source(&self) -> &str {
        &self.previous_msgid
    }
}

/// Highest number of plural forms a `msgstr[N]` may address
const MAX_PLURAL_FORMS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    None,
    Context,
    Id,
    IdPlural,
    Str(usize),
    PreviousId,
}

struct Builder {
    unit: PoUnit,
    has_id: bool,
    field: Field,
}

impl Builder {
    fn new() -> Self {
        Self {
            unit: PoUnit::default(),
            has_id: false,
            field: Field::None,
        }
    }

    fn is_touched(&self) -> bool {
        self.has_id
    }

    fn append(&mut self, text: String, line: usize) -> Result<(), FormatError> {
        match self.field {
            Field::Context => self.unit.msgctxt.push_str(&text),
            Field::Id => self.unit.msgid.push_str(&text),
            Field::IdPlural => {
                if let Some(plural) = self.unit.msgid_plural.as_mut() {
                    plural.push_str(&text);
                }
            }
            Field::Str(idx) => {
                if let Some(value) = self.unit.msgstr.get_mut(idx) {
                    value.push_str(&text);
                }
            }
            Field::PreviousId => self.unit.previous_msgid.push_str(&text),
            Field::None => {
                return Err(FormatError::Parse {
                    line,
                    message: "string continuation without keyword".to_string(),
                });
            }
        }
        Ok(())
    }

    fn set_msgstr(&mut self, idx: usize, text: String, line: usize) -> Result<(), FormatError> {
        if idx >= MAX_PLURAL_FORMS {
            return Err(FormatError::Parse {
                line,
                message: format!("plural index {} out of range", idx),
            });
        }
        if self.unit.msgstr.len() <= idx {
            self.unit.msgstr.resize(idx + 1, String::new());
        }
        self.unit.msgstr[idx] = text;
        self.field = Field::Str(idx);
        Ok(())
    }
}

/// Parse PO file content
pub fn parse(content: &str) -> Result<Vec<PoUnit>, FormatError> {
    let mut units = Vec::new();
    let mut builder = Builder::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() {
            flush(&mut builder, &mut units);
            continue;
        }

        if line.starts_with("#~") {
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if builder.is_touched() && !rest.starts_with('|') {
                flush(&mut builder, &mut units);
            }
            parse_comment(&mut builder, rest, line_no)?;
            continue;
        }

        if line.starts_with('"') {
            let text = unquote(line, line_no)?;
            builder.append(text, line_no)?;
            continue;
        }

        let (keyword, value) = line.split_once(char::is_whitespace).ok_or_else(|| FormatError::Parse {
            line: line_no,
            message: format!("unexpected line: {}", line),
        })?;
        let text = unquote(value.trim(), line_no)?;

        match keyword {
            "msgctxt" => {
                if builder.is_touched() {
                    flush(&mut builder, &mut units);
                }
                builder.unit.msgctxt = text;
                builder.field = Field::Context;
            }
            "msgid" => {
                if builder.is_touched() {
                    flush(&mut builder, &mut units);
                }
                builder.unit.msgid = text;
                builder.has_id = true;
                builder.field = Field::Id;
            }
            "msgid_plural" => {
                builder.unit.msgid_plural = Some(text);
                builder.field = Field::IdPlural;
            }
            "msgstr" => builder.set_msgstr(0, text, line_no)?,
            other => {
                let index = other
                    .strip_prefix("msgstr[")
                    .and_then(|s| s.strip_suffix(']'))
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or_else(|| FormatError::Parse {
                        line: line_no,
                        message: format!("unknown keyword: {}", other),
                    })?;
                builder.set_msgstr(index, text, line_no)?;
            }
        }
    }

    flush(&mut builder, &mut units);
    Ok(units)
}

fn flush(builder: &mut Builder, units: &mut Vec<PoUnit>) {
    let finished = std::mem::replace(builder, Builder::new());
    if finished.has_id {
        units.push(finished.unit.finalize());
    }
}

fn parse_comment(builder: &mut Builder, rest: &str, line: usize) -> Result<(), FormatError> {
    if let Some(flags) = rest.strip_prefix(',') {
        builder.unit.flags.extend(
            flags
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from),
        );
    } else if let Some(refs) = rest.strip_prefix(':') {
        builder
            .unit
            .locations
            .extend(refs.split_whitespace().map(String::from));
    } else if let Some(comment) = rest.strip_prefix('.') {
        builder.unit.extracted_comments.push(comment.trim().to_string());
    } else if let Some(previous) = rest.strip_prefix('|') {
        let previous = previous.trim();
        if let Some(value) = previous.strip_prefix("msgid ") {
            builder.unit.previous_msgid = unquote(value.trim(), line)?;
            builder.field = Field::PreviousId;
        } else if previous.starts_with('"') && builder.field == Field::PreviousId {
            let text = unquote(previous, line)?;
            builder.unit.previous_msgid.push_str(&text);
        }
    }
    // Translator comments are not stored
    Ok(())
}

fn unquote(value: &str, line: usize) -> Result<String, FormatError> {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|_| value.len() >= 2)
        .ok_or_else(|| FormatError::Parse {
            line,
            message: format!("expected quoted string, got: {}", value),
        })?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {
                return Err(FormatError::Parse {
                    line,
                    message: "dangling escape".to_string(),
                });
            }
        }
    }
    Ok(out)
}
