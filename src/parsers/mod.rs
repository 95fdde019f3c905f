pub mod cobertura;
pub mod jacoco;
pub mod pit;

use std::collections::HashMap;
use std::io::BufRead;
use std::str::{self, FromStr};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::detect::Format;
use crate::diagnostics::FilteredLog;
use crate::error::{CoverageError, Result};
use crate::interner::PathInterner;
use crate::tree::CoverageTree;

/// How a parser reacts to a document without any qualifying entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Fail with [`CoverageError::NoData`].
    #[default]
    FailFast,
    /// Log the problem and return the empty tree.
    IgnoreErrors,
}

/// Every report dialect implements this trait.
pub trait CoverageParser {
    fn format(&self) -> Format;

    /// Read one report from `reader` in a single forward pass.
    fn parse(
        &self,
        reader: &mut dyn BufRead,
        interner: &mut PathInterner,
        log: &mut FilteredLog,
    ) -> Result<CoverageTree>;
}

/// The parser for `format`.
pub fn parser_for(format: Format, mode: ProcessingMode) -> Box<dyn CoverageParser> {
    match format {
        Format::Cobertura => Box::new(cobertura::CoberturaParser::new(mode)),
        Format::Jacoco => Box::new(jacoco::JacocoParser::new(mode)),
        Format::Pit => Box::new(pit::PitParser::new(mode)),
    }
}

/// Return `tree` if it holds data, otherwise apply `mode`.
pub(crate) fn finish(
    tree: CoverageTree,
    found: usize,
    format: Format,
    mode: ProcessingMode,
    log: &mut FilteredLog,
) -> Result<CoverageTree> {
    if found > 0 {
        return Ok(tree);
    }
    let what = format.content();
    match mode {
        ProcessingMode::FailFast => Err(CoverageError::NoData { format: what }),
        ProcessingMode::IgnoreErrors => {
            log.log_error(format!("No {what} information found in the report"));
            Ok(tree)
        }
    }
}

/// `com/example` and `com.example` both become `com.example`; the default
/// package is named `-`.
pub(crate) fn normalize_package_name(name: &str) -> String {
    let dotted = name.trim().replace(['/', '\\'], ".");
    if dotted.is_empty() {
        "-".to_string()
    } else {
        dotted
    }
}

/// A start tag with its attributes copied out of the reader's buffer.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    name: String,
    attributes: HashMap<String, String>,
}

impl Element {
    fn from_start(start: &BytesStart) -> Self {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .filter_map(|a| {
                let attr = a.ok()?;
                let key = str::from_utf8(attr.key.local_name().into_inner())
                    .ok()?
                    .to_string();
                let value = attr.unescape_value().ok()?.to_string();
                Some((key, value))
            })
            .collect();
        Self { name, attributes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn required(&self, key: &str) -> Result<&str> {
        self.attr(key).ok_or_else(|| CoverageError::MissingAttribute {
            element: self.name.clone(),
            attribute: key.to_string(),
        })
    }

    /// Numeric attribute; absent or malformed values read as zero.
    pub fn number<T: FromStr + Default>(&self, key: &str, log: &mut FilteredLog) -> T {
        match self.attr(key) {
            Some(text) => self.parse_number(key, text, log),
            None => T::default(),
        }
    }

    /// Numeric attribute that must be present; malformed values read as zero.
    pub fn required_number<T: FromStr + Default>(
        &self,
        key: &str,
        log: &mut FilteredLog,
    ) -> Result<T> {
        let text = self.required(key)?;
        Ok(self.parse_number(key, text, log))
    }

    fn parse_number<T: FromStr + Default>(
        &self,
        key: &str,
        text: &str,
        log: &mut FilteredLog,
    ) -> T {
        text.trim().parse().unwrap_or_else(|_| {
            log.log_error(format!(
                "Invalid number '{text}' in attribute '{key}' of <{}>, using 0",
                self.name
            ));
            T::default()
        })
    }
}

/// Owned view of the XML events the parsers care about.
#[derive(Debug)]
pub(crate) enum XmlEvent {
    Start(Element),
    End(String),
    Text(String),
    Eof,
}

/// Forward-only pull reader over a report. Empty elements are reported as a
/// start followed by an end, so every `Start` has a matching `End`.
pub(crate) struct XmlStream<'r> {
    reader: Reader<&'r mut dyn BufRead>,
    buf: Vec<u8>,
}

impl<'r> XmlStream<'r> {
    pub fn new(input: &'r mut dyn BufRead) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        reader.expand_empty_elements(true);
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    pub fn next(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => return Err(xml_err(e, &self.reader)),
            };
            return Ok(match event {
                Event::Start(ref e) => XmlEvent::Start(Element::from_start(e)),
                Event::End(ref e) => {
                    XmlEvent::End(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
                }
                Event::Text(ref e) => match e.unescape() {
                    Ok(text) => XmlEvent::Text(text.into_owned()),
                    Err(err) => return Err(xml_err(err, &self.reader)),
                },
                Event::CData(e) => {
                    XmlEvent::Text(String::from_utf8_lossy(&e.into_inner()).into_owned())
                }
                Event::Eof => XmlEvent::Eof,
                _ => continue,
            });
        }
    }

    /// Consume everything up to and including the end of `element`, whose
    /// start tag was just read.
    pub fn skip(&mut self, element: &str) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next()? {
                XmlEvent::Start(_) => depth += 1,
                XmlEvent::End(_) if depth == 0 => return Ok(()),
                XmlEvent::End(_) => depth -= 1,
                XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(unexpected_eof(element)),
            }
        }
    }

    /// Character data of `element`, trimmed. Nested elements are skipped.
    pub fn read_text(&mut self, element: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                XmlEvent::Text(t) => text.push_str(&t),
                XmlEvent::Start(child) => self.skip(child.name())?,
                XmlEvent::End(_) => return Ok(text.trim().to_string()),
                XmlEvent::Eof => return Err(unexpected_eof(element)),
            }
        }
    }
}

pub(crate) fn unexpected_eof(element: &str) -> CoverageError {
    CoverageError::UnexpectedEof {
        element: element.to_string(),
    }
}

fn xml_err<R>(source: quick_xml::Error, reader: &Reader<R>) -> CoverageError {
    CoverageError::Xml {
        source,
        position: reader.buffer_position(),
    }
}
