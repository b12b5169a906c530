//! XML ingestion: a SAX-style state machine over `quick-xml` events.
//!
//! The document structure is validated as it streams in: every state has an
//! allowed child-tag set, and for `nta`, `template`, `location`, and
//! `transition` the legal child also depends on the most recently closed
//! sibling. Character data is buffered only where it is semantically
//! significant (`declaration`, `instantiation`, `system`, `parameter`,
//! `name`, `label`) and handed to the text driver with a start symbol
//! matching the context.
//!
//! The driver keeps an XPath (with positional indices) for the open element
//! chain and feeds it to the error handler, so every diagnostic says where
//! in the document it arose. A structural error switches to an error state
//! that swallows events until the enclosing element closes.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use tack_base::ErrorHandler;

use crate::builder::Builder;
use crate::parser::{parse_xta, StartSymbol};
use crate::token::{tag, Tag};

/// Default page size of the body buffer.
const DEFAULT_PAGE_SIZE: usize = 1024;

/// Text accumulator growing in page-sized steps, doubling when it runs out.
///
/// The page size is tunable so tests can watch the growth policy.
#[derive(Debug)]
pub struct PageBuffer {
    data: String,
    pages: usize,
    page_size: usize,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            data: String::new(),
            pages: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn append(&mut self, text: &str) {
        let needed = self.data.len() + text.len() + 1;
        if self.pages == 0 {
            self.pages = 1;
        }
        while needed > self.pages * self.page_size {
            self.pages *= 2;
        }
        let capacity = self.pages * self.page_size;
        if self.data.capacity() < capacity {
            self.data.reserve_exact(capacity - self.data.len());
        }
        self.data.push_str(text);
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn is_blank(&self) -> bool {
        self.data.chars().all(char::is_whitespace)
    }

    /// Pages currently allocated; exposed for the growth-policy tests.
    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.pages = 0;
    }
}

impl Default for PageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the identifier from element text: optional surrounding white
/// space around one alphanumeric word starting with a letter.
pub(crate) fn symbol(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(trimmed.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XmlState {
    Error,
    Initial,
    Nta,
    Imports,
    Declaration,
    Template,
    Instantiation,
    System,
    Name,
    Parameter,
    Location,
    Init,
    Transition,
    Label,
    Urgent,
    Committed,
    Source,
    Target,
    Nail,
}

fn state_of(tag: Tag) -> XmlState {
    match tag {
        Tag::Nta => XmlState::Nta,
        Tag::Imports => XmlState::Imports,
        Tag::Declaration => XmlState::Declaration,
        Tag::Template => XmlState::Template,
        Tag::Instantiation => XmlState::Instantiation,
        Tag::System => XmlState::System,
        Tag::Name => XmlState::Name,
        Tag::Parameter => XmlState::Parameter,
        Tag::Location => XmlState::Location,
        Tag::Init => XmlState::Init,
        Tag::Transition => XmlState::Transition,
        Tag::Urgent => XmlState::Urgent,
        Tag::Committed => XmlState::Committed,
        Tag::Source => XmlState::Source,
        Tag::Target => XmlState::Target,
        Tag::Label => XmlState::Label,
        Tag::Nail => XmlState::Nail,
    }
}

/// Tags whose XPath component carries a positional index.
fn is_counted(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::Template | Tag::Location | Tag::Transition | Tag::Label | Tag::Nail
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    None,
    Invariant,
    Guard,
    Sync,
    Assign,
}

#[derive(Debug, Clone, Copy)]
struct OpenElement {
    /// State to restore when this element closes.
    prior: XmlState,
    tag: Tag,
    /// State this element settled in (`Error` when it was rejected).
    state: XmlState,
    /// 1-based position among same-tag siblings.
    index: usize,
}

struct XmlReaderState<'a> {
    builder: &'a mut dyn Builder,
    handler: &'a mut dyn ErrorHandler,
    new_syntax: bool,

    state: XmlState,
    history: Vec<OpenElement>,
    siblings: Vec<Vec<XmlState>>,

    body: PageBuffer,
    invariant: PageBuffer,

    template_name: Option<String>,
    proc_begun: bool,
    location_name: Option<String>,
    location_id: Option<String>,
    locations: HashMap<String, String>,
    label_kind: LabelKind,
    urgent: bool,
    committed: bool,
    source_ref: Option<String>,
    target_ref: Option<String>,
    controllable: bool,
    edge_open: bool,

    failed: bool,
}

impl<'a> XmlReaderState<'a> {
    fn new(
        builder: &'a mut dyn Builder,
        handler: &'a mut dyn ErrorHandler,
        new_syntax: bool,
        page_size: usize,
    ) -> Self {
        Self {
            builder,
            handler,
            new_syntax,
            state: XmlState::Initial,
            history: Vec::new(),
            siblings: Vec::new(),
            body: PageBuffer::with_page_size(page_size),
            invariant: PageBuffer::with_page_size(page_size),
            template_name: None,
            proc_begun: false,
            location_name: None,
            location_id: None,
            locations: HashMap::new(),
            label_kind: LabelKind::None,
            urgent: false,
            committed: false,
            source_ref: None,
            target_ref: None,
            controllable: true,
            edge_open: false,
            failed: false,
        }
    }

    // ------------------------------------------------------------------
    // Paths and reporting
    // ------------------------------------------------------------------

    fn xpath(&self) -> String {
        let mut path = String::new();
        for open in &self.history {
            path.push('/');
            path.push_str(open.tag.as_str());
            if is_counted(open.tag) {
                path.push_str(&format!("[{}]", open.index));
            }
        }
        path
    }

    fn child_path(&self, tag: Tag) -> String {
        let mut path = self.xpath();
        path.push('/');
        path.push_str(tag.as_str());
        if is_counted(tag) {
            let count = self
                .siblings
                .last()
                .map_or(0, |sibs| sibs.iter().filter(|s| **s == state_of(tag)).count());
            path.push_str(&format!("[{}]", count + 1));
        }
        path
    }

    fn set_path(&mut self, path: &str) {
        if path.is_empty() {
            self.handler.set_current_path(None);
        } else {
            self.handler.set_current_path(Some(path));
        }
    }

    fn fail(&mut self, message: &str) {
        self.handler.handle_error(message);
        self.failed = true;
    }

    /// Reports and switches to the error state.
    fn structural_error(&mut self, message: &str) {
        self.fail(message);
        self.state = XmlState::Error;
    }

    /// Forwards a builder result to the handler.
    fn call(&mut self, result: tack_base::Result<()>) {
        if let Err(e) = result {
            self.fail(&e.message);
        }
    }

    fn sub_parse(&mut self, text: &str, start: StartSymbol) -> i32 {
        let status = parse_xta(text, self.builder, self.handler, self.new_syntax, start);
        if status < 0 {
            self.failed = true;
        }
        status
    }

    // ------------------------------------------------------------------
    // Document events
    // ------------------------------------------------------------------

    fn start_document(&mut self) {
        self.state = XmlState::Initial;
        self.history.clear();
        self.siblings.clear();
        self.siblings.push(Vec::new());
        self.set_path("");
    }

    fn end_document(&mut self) {
        if self.state != XmlState::Initial {
            let path = self.xpath();
            self.set_path(&path);
            self.fail("document ended before all tags were closed");
        }
        self.set_path("");
        let result = self.builder.done();
        self.call(result);
    }

    fn last_sibling(&self) -> Option<XmlState> {
        self.siblings.last().and_then(|sibs| sibs.last()).copied()
    }

    fn siblings_empty(&self) -> bool {
        self.siblings.last().map_or(true, |sibs| sibs.is_empty())
    }

    /// Checks a sibling-order condition, erroring out when violated.
    fn check_siblings(&mut self, ok: bool) -> bool {
        if !ok {
            self.structural_error("sibling ordering or quantity incorrect");
        }
        ok
    }

    /// A template may omit `<parameter>`; the builder call is deferred
    /// until the first child that needs the template open.
    fn ensure_proc_begun(&mut self) {
        if self.proc_begun {
            return;
        }
        self.proc_begun = true;
        match self.template_name.take() {
            Some(name) => {
                let result = self.builder.proc_begin(&name);
                self.call(result);
            }
            None => self.fail("template has no name"),
        }
    }

    fn attr<'b>(attrs: &'b [(String, String)], name: &str) -> Option<&'b str> {
        attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn start_element(&mut self, name: &str, attrs: &[(String, String)]) {
        let Some(tag) = tag(name) else {
            let path = format!("{}/{}", self.xpath(), name);
            self.set_path(&path);
            self.structural_error(&format!("unknown tag {}", name));
            return;
        };

        let prior = self.state;
        let index = self
            .siblings
            .last()
            .map_or(0, |sibs| sibs.iter().filter(|s| **s == state_of(tag)).count())
            + 1;
        let path = self.child_path(tag);
        self.set_path(&path);

        if self.state != XmlState::Error {
            self.transition(tag, attrs);
        }

        self.history.push(OpenElement {
            prior,
            tag,
            state: self.state,
            index,
        });
        self.siblings.push(Vec::new());
    }

    /// The per-parent child grammar; leaves `self.state` at the child's
    /// state or `Error`.
    fn transition(&mut self, tag: Tag, attrs: &[(String, String)]) {
        match self.state {
            XmlState::Initial => {
                if tag == Tag::Nta {
                    self.state = XmlState::Nta;
                } else {
                    self.structural_error(&format!(
                        "nta tag expected but {} found",
                        tag.as_str()
                    ));
                }
            }
            XmlState::Nta => match tag {
                Tag::Imports => {
                    if self.check_siblings(self.siblings_empty()) {
                        self.state = XmlState::Imports;
                    }
                }
                Tag::Declaration => {
                    let ok = self.siblings_empty()
                        || self.last_sibling() == Some(XmlState::Imports);
                    if self.check_siblings(ok) {
                        self.state = XmlState::Declaration;
                    }
                }
                Tag::Template => {
                    let ok = self.siblings_empty()
                        || matches!(
                            self.last_sibling(),
                            Some(XmlState::Imports)
                                | Some(XmlState::Declaration)
                                | Some(XmlState::Template)
                        );
                    if self.check_siblings(ok) {
                        self.state = XmlState::Template;
                        self.template_name = None;
                        self.proc_begun = false;
                    }
                }
                Tag::Instantiation => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Template) | Some(XmlState::Instantiation)
                    );
                    if self.check_siblings(ok) {
                        self.state = XmlState::Instantiation;
                    }
                }
                Tag::System => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Template) | Some(XmlState::Instantiation)
                    );
                    if self.check_siblings(ok) {
                        self.state = XmlState::System;
                    }
                }
                _ => {
                    self.check_siblings(false);
                }
            },
            XmlState::Template => match tag {
                Tag::Name => {
                    if self.check_siblings(self.siblings_empty()) {
                        self.state = XmlState::Name;
                    }
                }
                Tag::Parameter => {
                    let ok = self.last_sibling() == Some(XmlState::Name);
                    if self.check_siblings(ok) {
                        self.state = XmlState::Parameter;
                    }
                }
                Tag::Declaration => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Name) | Some(XmlState::Parameter)
                    );
                    if self.check_siblings(ok) {
                        self.ensure_proc_begun();
                        self.state = XmlState::Declaration;
                    }
                }
                Tag::Location => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Name)
                            | Some(XmlState::Parameter)
                            | Some(XmlState::Declaration)
                            | Some(XmlState::Location)
                    );
                    if self.check_siblings(ok) {
                        self.ensure_proc_begun();
                        self.state = XmlState::Location;
                        self.label_kind = LabelKind::None;
                        self.location_name = None;
                        self.committed = false;
                        self.urgent = false;
                        match Self::attr(attrs, "id") {
                            Some(id) => self.location_id = Some(id.to_string()),
                            None => {
                                self.location_id = None;
                                self.fail("location has no id attribute");
                            }
                        }
                    }
                }
                Tag::Init => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Name)
                            | Some(XmlState::Parameter)
                            | Some(XmlState::Declaration)
                            | Some(XmlState::Location)
                    );
                    if self.check_siblings(ok) {
                        self.ensure_proc_begun();
                        self.state = XmlState::Init;
                        let name = Self::attr(attrs, "ref")
                            .and_then(|r| self.locations.get(r).cloned());
                        match name {
                            Some(name) => {
                                let result = self.builder.proc_state_init(&name);
                                self.call(result);
                            }
                            None => self.fail("init refers to an undeclared location"),
                        }
                    }
                }
                Tag::Transition => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Name)
                            | Some(XmlState::Parameter)
                            | Some(XmlState::Declaration)
                            | Some(XmlState::Location)
                            | Some(XmlState::Init)
                            | Some(XmlState::Transition)
                    );
                    if self.check_siblings(ok) {
                        self.ensure_proc_begun();
                        self.state = XmlState::Transition;
                        self.source_ref = None;
                        self.target_ref = None;
                        self.edge_open = false;
                        self.controllable = Self::attr(attrs, "controllable") != Some("false");
                    }
                }
                _ => {
                    self.check_siblings(false);
                }
            },
            XmlState::Location => match tag {
                Tag::Name => {
                    if self.check_siblings(self.siblings_empty()) {
                        self.state = XmlState::Name;
                    }
                }
                Tag::Label => {
                    let ok = self.siblings_empty()
                        || matches!(
                            self.last_sibling(),
                            Some(XmlState::Name) | Some(XmlState::Label)
                        );
                    if self.check_siblings(ok) {
                        self.state = XmlState::Label;
                        self.label_kind = label_kind(Self::attr(attrs, "kind"));
                    }
                }
                Tag::Urgent => {
                    self.urgent = true;
                    self.state = XmlState::Urgent;
                }
                Tag::Committed => {
                    self.committed = true;
                    self.state = XmlState::Committed;
                }
                _ => {
                    self.check_siblings(false);
                }
            },
            XmlState::Transition => match tag {
                Tag::Source => {
                    if self.check_siblings(self.siblings_empty()) {
                        self.state = XmlState::Source;
                        self.source_ref = self.resolve_endpoint(attrs);
                    }
                }
                Tag::Target => {
                    let ok = self.last_sibling() == Some(XmlState::Source);
                    if self.check_siblings(ok) {
                        self.state = XmlState::Target;
                        self.target_ref = self.resolve_endpoint(attrs);
                    }
                }
                Tag::Label => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Target) | Some(XmlState::Label)
                    );
                    if self.check_siblings(ok) {
                        self.state = XmlState::Label;
                        self.label_kind = label_kind(Self::attr(attrs, "kind"));
                    }
                }
                Tag::Nail => {
                    let ok = matches!(
                        self.last_sibling(),
                        Some(XmlState::Target) | Some(XmlState::Label) | Some(XmlState::Nail)
                    );
                    if self.check_siblings(ok) {
                        self.state = XmlState::Nail;
                    }
                }
                _ => {
                    self.check_siblings(false);
                }
            },
            _ => {
                self.structural_error(&format!(
                    "invalid tag {} at this position",
                    tag.as_str()
                ));
            }
        }
    }

    fn resolve_endpoint(&mut self, attrs: &[(String, String)]) -> Option<String> {
        let name = Self::attr(attrs, "ref").and_then(|r| self.locations.get(r).cloned());
        if name.is_none() {
            self.fail("transition endpoint refers to an undeclared location");
        }
        name
    }

    fn characters(&mut self, text: &str) {
        match self.state {
            XmlState::Declaration
            | XmlState::Instantiation
            | XmlState::System
            | XmlState::Parameter
            | XmlState::Name
            | XmlState::Label => self.body.append(text),
            XmlState::Error
            | XmlState::Nta
            | XmlState::Template
            | XmlState::Location
            | XmlState::Transition => {}
            _ => {
                if !text.chars().all(char::is_whitespace) {
                    self.handler
                        .handle_warning(&format!("text ignored: {}", text.trim()));
                }
            }
        }
    }

    fn end_element(&mut self, name: &str) {
        let Some(tag) = tag(name) else {
            self.structural_error(&format!("unknown tag {}", name));
            return;
        };

        let entry = match self.history.last() {
            Some(open) if open.tag == tag => *open,
            _ => {
                self.structural_error(&format!("cannot use {} end tag", name));
                return;
            }
        };

        if entry.state != XmlState::Error {
            self.dispatch_close(&entry);
        }

        self.history.pop();
        self.siblings.pop();
        if let Some(parent) = self.siblings.last_mut() {
            parent.push(entry.state);
        }
        self.state = entry.prior;
        self.body.clear();
        let path = self.xpath();
        self.set_path(&path);
    }

    fn dispatch_close(&mut self, entry: &OpenElement) {
        match entry.state {
            XmlState::Declaration => match entry.prior {
                XmlState::Nta => {
                    if !self.body.is_blank() {
                        let body = std::mem::take(&mut self.body.data);
                        self.sub_parse(&body, StartSymbol::Declaration);
                    }
                }
                XmlState::Template => {
                    if !self.body.is_blank() {
                        let body = std::mem::take(&mut self.body.data);
                        self.sub_parse(&body, StartSymbol::LocalDeclaration);
                    }
                }
                _ => self.fail("declaration tag is not allowed here"),
            },
            XmlState::Template => {
                self.ensure_proc_begun();
                let result = self.builder.proc_end();
                self.call(result);
                self.template_name = None;
                self.proc_begun = false;
                self.locations.clear();
            }
            XmlState::Instantiation => {
                if !self.body.is_blank() {
                    let body = std::mem::take(&mut self.body.data);
                    self.sub_parse(&body, StartSymbol::Instantiation);
                }
            }
            XmlState::System => {
                let body = std::mem::take(&mut self.body.data);
                self.sub_parse(&body, StartSymbol::SystemLine);
            }
            XmlState::Name => match entry.prior {
                XmlState::Template => {
                    self.template_name = symbol(self.body.as_str());
                    if self.template_name.is_none() {
                        self.fail("template name is not a valid identifier");
                    }
                }
                XmlState::Location => {
                    self.location_name = symbol(self.body.as_str());
                }
                _ => {}
            },
            XmlState::Parameter => {
                if !self.body.is_blank() {
                    let body = std::mem::take(&mut self.body.data);
                    self.sub_parse(&body, StartSymbol::ParameterList);
                }
                self.ensure_proc_begun();
            }
            XmlState::Location => self.close_location(),
            XmlState::Transition => {
                if self.edge_open {
                    let source = self.source_ref.take().unwrap_or_default();
                    let target = self.target_ref.take().unwrap_or_default();
                    let result = self.builder.proc_edge_end(&source, &target);
                    self.call(result);
                }
                self.source_ref = None;
                self.target_ref = None;
                self.edge_open = false;
            }
            XmlState::Target => {
                if let (Some(source), Some(target)) =
                    (self.source_ref.clone(), self.target_ref.clone())
                {
                    let controllable = self.controllable;
                    let result = self.builder.proc_edge_begin(&source, &target, controllable);
                    self.call(result);
                    self.edge_open = true;
                }
            }
            XmlState::Label => self.close_label(),
            _ => {}
        }
    }

    fn close_location(&mut self) {
        let id = match self.location_id.take() {
            Some(id) => id,
            None => return,
        };
        let name = match self.location_name.take() {
            Some(name) if !name.is_empty() => name,
            _ => format!("_{}", id),
        };
        self.locations.insert(id, name.clone());

        if self.invariant.is_blank() {
            let result = self.builder.expr_true();
            self.call(result);
        } else {
            let invariant = std::mem::take(&mut self.invariant.data);
            self.sub_parse(&invariant, StartSymbol::Invariant);
        }
        let result = self.builder.proc_state(&name, true);
        self.call(result);

        if self.committed {
            let result = self.builder.proc_state_commit(&name);
            self.call(result);
        }
        if self.urgent {
            let result = self.builder.proc_state_urgent(&name);
            self.call(result);
        }
        self.invariant.clear();
    }

    fn close_label(&mut self) {
        match self.label_kind {
            LabelKind::Invariant => {
                if !self.body.is_blank() {
                    let body = std::mem::take(&mut self.body.data);
                    self.invariant.append(&body);
                }
            }
            LabelKind::Guard => {
                if self.body.is_blank() {
                    let result = self.builder.expr_true();
                    self.call(result);
                } else {
                    let body = std::mem::take(&mut self.body.data);
                    self.sub_parse(&body, StartSymbol::Guard);
                }
            }
            LabelKind::Sync => {
                if self.body.is_blank() {
                    let result = self.builder.expr_true();
                    self.call(result);
                } else {
                    let body = std::mem::take(&mut self.body.data);
                    self.sub_parse(&body, StartSymbol::Sync);
                }
            }
            LabelKind::Assign => {
                if self.body.is_blank() {
                    let result = self.builder.expr_true();
                    self.call(result);
                } else {
                    let body = std::mem::take(&mut self.body.data);
                    self.sub_parse(&body, StartSymbol::Assign);
                }
            }
            LabelKind::None => {}
        }
        self.label_kind = LabelKind::None;
    }
}

fn label_kind(kind: Option<&str>) -> LabelKind {
    match kind {
        Some("invariant") => LabelKind::Invariant,
        Some("guard") => LabelKind::Guard,
        Some("synchronisation") => LabelKind::Sync,
        Some("assignment") => LabelKind::Assign,
        _ => LabelKind::None,
    }
}

fn decode_start(e: &BytesStart<'_>) -> Option<(String, Vec<(String, String)>)> {
    let name = std::str::from_utf8(e.name().as_ref()).ok()?.to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.ok()?;
        let key = std::str::from_utf8(attr.key.as_ref()).ok()?.to_string();
        let value = attr.unescape_value().ok()?.into_owned();
        attrs.push((key, value));
    }
    Some((name, attrs))
}

/// Parses an XML document from memory.
///
/// Returns `0` on success and `-1` on malformed XML or any reported error.
/// All recoverable diagnostics go through `handler` with an XPath prefix.
pub fn parse_xml_buffer(
    doc: &str,
    builder: &mut dyn Builder,
    handler: &mut dyn ErrorHandler,
    new_syntax: bool,
) -> i32 {
    parse_xml_with_page_size(doc, builder, handler, new_syntax, DEFAULT_PAGE_SIZE)
}

/// [`parse_xml_buffer`] with a custom body-buffer page size (for tests).
pub fn parse_xml_with_page_size(
    doc: &str,
    builder: &mut dyn Builder,
    handler: &mut dyn ErrorHandler,
    new_syntax: bool,
    page_size: usize,
) -> i32 {
    let mut state = XmlReaderState::new(builder, handler, new_syntax, page_size);
    state.start_document();

    let mut reader = Reader::from_str(doc);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match decode_start(&e) {
                Some((name, attrs)) => state.start_element(&name, &attrs),
                None => return -1,
            },
            Ok(Event::Empty(e)) => match decode_start(&e) {
                Some((name, attrs)) => {
                    state.start_element(&name, &attrs);
                    state.end_element(&name);
                }
                None => return -1,
            },
            Ok(Event::End(e)) => match std::str::from_utf8(e.name().as_ref()) {
                Ok(name) => {
                    let name = name.to_string();
                    state.end_element(&name);
                }
                Err(_) => return -1,
            },
            Ok(Event::Text(e)) => match e.unescape() {
                Ok(text) => state.characters(&text),
                Err(_) => return -1,
            },
            Ok(Event::CData(e)) => {
                let bytes = e.into_inner();
                match std::str::from_utf8(&bytes) {
                    Ok(text) => {
                        let text = text.to_string();
                        state.characters(&text);
                    }
                    Err(_) => return -1,
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return -1,
        }
    }

    state.end_document();
    if state.failed {
        -1
    } else {
        0
    }
}

/// Parses an XML document from a file; `-1` if the file cannot be read.
pub fn parse_xml_file(
    path: &str,
    builder: &mut dyn Builder,
    handler: &mut dyn ErrorHandler,
    new_syntax: bool,
) -> i32 {
    match std::fs::read_to_string(path) {
        Ok(doc) => parse_xml_buffer(&doc, builder, handler, new_syntax),
        Err(_) => -1,
    }
}
