//! In-memory Automation host for tests.
//!
//! [`FakeHost`] models a small Word or PowerPoint object graph and records
//! what the wrapper layer does to it: references taken and released per
//! object, event subscriptions, and collection accesses the host rejected
//! as out of range. Faults can be injected per object and member.

#![allow(clippy::missing_panics_doc)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::application::{Application, OfficeApp};
use crate::error::InteropResult;
use crate::events::EventKind;
use crate::native::{EventSink, NativeError, NativeObject, NativeResult, Variant, codes};

/// Index of an object in the fake host.
pub type ObjectId = usize;

/// A property value stored by the fake host.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nothing,
    Bool(bool),
    Int(i32),
    Double(f64),
    Text(String),
    Object(ObjectId),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Self::Object(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Node {
    class: &'static str,
    props: HashMap<String, Value>,
    /// `Some` for collections: the class of the members.
    member_class: Option<&'static str>,
    items: Vec<ObjectId>,
    owner: Option<ObjectId>,
    parent: Option<ObjectId>,
    deleted: bool,
    live: usize,
    releases: usize,
}

struct Subscription {
    cookie: u32,
    source: ObjectId,
    event: EventKind,
    sink: EventSink<FakeHandle>,
}

#[derive(Default)]
struct World {
    nodes: Vec<Node>,
    faults: HashMap<(ObjectId, String), i32>,
    subscriptions: Vec<Subscription>,
    next_cookie: u32,
    out_of_range: usize,
}

fn fault(code: i32, message: &str) -> NativeError {
    NativeError::new(code, message)
}

impl World {
    fn node(&self, id: ObjectId) -> &Node {
        &self.nodes[id]
    }

    fn node_mut(&mut self, id: ObjectId) -> &mut Node {
        &mut self.nodes[id]
    }

    fn create(&mut self, class: &'static str, parent: Option<ObjectId>) -> ObjectId {
        self.nodes.push(Node {
            class,
            props: HashMap::new(),
            member_class: None,
            items: Vec::new(),
            owner: None,
            parent,
            deleted: false,
            live: 0,
            releases: 0,
        });
        self.nodes.len() - 1
    }

    fn set(&mut self, id: ObjectId, member: &str, value: Value) {
        self.node_mut(id).props.insert(member.to_string(), value);
    }

    fn collection(&mut self, name: &'static str, member_class: &'static str, parent: ObjectId) -> ObjectId {
        let id = self.create(name, Some(parent));
        self.node_mut(id).member_class = Some(member_class);
        self.set(parent, name, Value::Object(id));
        id
    }

    fn range(&mut self, parent: ObjectId, text: &str) -> ObjectId {
        let id = self.create("Range", Some(parent));
        let len = i32::try_from(text.chars().count()).unwrap_or(i32::MAX);
        self.set(id, "Text", Value::Text(text.to_string()));
        self.set(id, "Start", Value::Int(0));
        self.set(id, "End", Value::Int(len));
        self.set(id, "Bold", Value::Int(0));
        let font = self.create("Font", Some(id));
        self.set(font, "Name", Value::Text("Calibri".into()));
        self.set(font, "Size", Value::Double(11.0));
        self.set(id, "Font", Value::Object(font));
        id
    }

    fn insert(&mut self, collection: ObjectId, position: usize, member: ObjectId) {
        self.node_mut(collection).items.insert(position, member);
        self.node_mut(member).owner = Some(collection);
    }

    fn append(&mut self, collection: ObjectId, member: ObjectId) {
        let end = self.node(collection).items.len();
        self.insert(collection, end, member);
    }

    /// Word hands back the open document when asked to open its path again.
    fn open_member(&self, collection: ObjectId, path: &str) -> Option<ObjectId> {
        self.node(collection)
            .items
            .iter()
            .copied()
            .find(|&m| self.node(m).props.get("FullName").and_then(Value::as_text) == Some(path))
    }

    fn owner_parent(&self, collection: ObjectId) -> Option<ObjectId> {
        self.node(collection).parent
    }

    fn word_application(&mut self) -> ObjectId {
        let app = self.create("Application", None);
        self.set(app, "Name", Value::Text("Microsoft Word".into()));
        self.set(app, "Version", Value::Text("16.0".into()));
        self.set(app, "Visible", Value::Bool(false));
        self.set(app, "DisplayAlerts", Value::Int(-1));
        self.collection("Documents", "Document", app);
        app
    }

    fn powerpoint_application(&mut self) -> ObjectId {
        let app = self.create("Application", None);
        self.set(app, "Name", Value::Text("Microsoft PowerPoint".into()));
        self.set(app, "Version", Value::Text("16.0".into()));
        self.set(app, "Visible", Value::Int(0));
        self.set(app, "DisplayAlerts", Value::Int(2));
        self.collection("Presentations", "Presentation", app);
        app
    }

    fn document(&mut self, documents: ObjectId, name: &str, paragraphs: &[&str]) -> ObjectId {
        let app = self.owner_parent(documents);
        let doc = self.create("Document", app);
        self.set(doc, "Name", Value::Text(name.to_string()));
        self.set(doc, "FullName", Value::Text(format!("C:\\docs\\{name}")));
        self.set(doc, "Saved", Value::Bool(true));

        let paras = self.collection("Paragraphs", "Paragraph", doc);
        for text in paragraphs {
            self.paragraph(paras, text);
        }
        self.collection("Shapes", "Shape", doc);
        let windows = self.collection("Windows", "Window", doc);
        let window = self.create("Window", Some(doc));
        self.set(window, "Caption", Value::Text(name.to_string()));
        self.set(window, "WindowState", Value::Int(0));
        self.set(window, "Document", Value::Object(doc));
        self.append(windows, window);

        let mut body: String = paragraphs.iter().map(|p| format!("{p}\r")).collect();
        if body.is_empty() {
            body.push('\r');
        }
        let content = self.range(doc, &body);
        self.set(doc, "Content", Value::Object(content));

        let setup = self.create("PageSetup", Some(doc));
        self.set(setup, "Orientation", Value::Int(0));
        self.set(setup, "PaperSize", Value::Int(2));
        self.set(setup, "TopMargin", Value::Double(72.0));
        self.set(doc, "PageSetup", Value::Object(setup));

        let selection = self.create("Selection", Some(window));
        let selected = self.range(selection, "");
        self.set(selection, "Text", Value::Text(String::new()));
        self.set(selection, "Start", Value::Int(0));
        self.set(selection, "End", Value::Int(0));
        self.set(selection, "Range", Value::Object(selected));
        self.set(doc, "Selection", Value::Object(selection));

        self.append(documents, doc);
        doc
    }

    fn paragraph(&mut self, paragraphs: ObjectId, text: &str) -> ObjectId {
        let doc = self.owner_parent(paragraphs);
        let para = self.create("Paragraph", doc);
        let range = self.range(para, &format!("{text}\r"));
        self.set(para, "Range", Value::Object(range));
        self.append(paragraphs, para);
        para
    }

    fn shape(&mut self, shapes: ObjectId, name: &str) -> ObjectId {
        let owner = self.owner_parent(shapes);
        let shape = self.create("Shape", owner);
        self.set(shape, "Name", Value::Text(name.to_string()));
        self.set(shape, "Type", Value::Int(17));
        self.set(shape, "Visible", Value::Int(-1));
        self.set(shape, "HasTextFrame", Value::Int(-1));
        for (member, value) in [("Left", 10.0), ("Top", 10.0), ("Width", 100.0), ("Height", 40.0)] {
            self.set(shape, member, Value::Double(value));
        }
        let frame = self.create("TextFrame", Some(shape));
        let text = self.range(frame, "");
        self.set(frame, "TextRange", Value::Object(text));
        self.set(shape, "TextFrame", Value::Object(frame));
        self.append(shapes, shape);
        shape
    }

    fn presentation(&mut self, presentations: ObjectId, name: &str) -> ObjectId {
        let app = self.owner_parent(presentations);
        let pres = self.create("Presentation", app);
        self.set(pres, "Name", Value::Text(name.to_string()));
        self.set(pres, "FullName", Value::Text(format!("C:\\decks\\{name}")));
        self.set(pres, "Saved", Value::Int(-1));
        self.collection("Slides", "Slide", pres);
        self.append(presentations, pres);
        pres
    }

    fn slide(&mut self, slides: ObjectId, position: usize, layout: i32) -> ObjectId {
        let pres = self.owner_parent(slides);
        let slide = self.create("Slide", pres);
        self.set(slide, "Name", Value::Text(format!("Slide{}", slide)));
        self.set(slide, "Layout", Value::Int(layout));
        self.collection("Shapes", "Shape", slide);
        self.insert(slides, position, slide);
        slide
    }

    fn check(&self, id: ObjectId, member: &str) -> NativeResult<()> {
        if self.node(id).deleted {
            return Err(fault(codes::E_FAIL, "The object has been deleted."));
        }
        match self.faults.get(&(id, member.to_string())) {
            Some(&code) => Err(fault(code, "Injected fault.")),
            None => Ok(()),
        }
    }

    fn item(&mut self, id: ObjectId, args: &[Value]) -> NativeResult<Value> {
        let len = self.node(id).items.len();
        let index = match args.first() {
            Some(Value::Int(n)) => usize::try_from(*n).ok(),
            _ => None,
        };
        match index {
            Some(n) if (1..=len).contains(&n) => Ok(Value::Object(self.node(id).items[n - 1])),
            _ => {
                self.out_of_range += 1;
                Err(fault(codes::DISP_E_BADINDEX, "Invalid index."))
            }
        }
    }

    fn active_document(&self, app: ObjectId) -> Option<ObjectId> {
        let documents = self.node(app).props.get("Documents")?.as_object()?;
        self.node(documents).items.last().copied()
    }

    fn get(&mut self, id: ObjectId, member: &str, args: &[Value]) -> NativeResult<Value> {
        self.check(id, member)?;
        let node = self.node(id);
        if node.member_class.is_some() {
            match member {
                "Count" => {
                    return Ok(Value::Int(i32::try_from(node.items.len()).unwrap_or(i32::MAX)));
                }
                "Item" => return self.item(id, args),
                _ => {}
            }
        }
        let no_document = || fault(codes::WORD_NO_DOCUMENT_OPEN, "This command is not available because no document is open.");
        match (node.class, member) {
            (_, "Parent") => Ok(node.parent.map_or(Value::Nothing, Value::Object)),
            ("Application", "ActiveDocument") => self.active_document(id).map(Value::Object).ok_or_else(no_document),
            ("Application", "ActiveWindow") => {
                let doc = self.active_document(id).ok_or_else(no_document)?;
                let windows = self.node(doc).props.get("Windows").and_then(Value::as_object);
                windows
                    .and_then(|w| self.node(w).items.first().copied())
                    .map(Value::Object)
                    .ok_or_else(no_document)
            }
            ("Application", "Selection") => {
                let doc = self.active_document(id).ok_or_else(|| {
                    fault(codes::WORD_COMMAND_NOT_AVAILABLE, "This command is not available.")
                })?;
                Ok(self.node(doc).props.get("Selection").cloned().unwrap_or(Value::Nothing))
            }
            ("Slide", "SlideIndex") => {
                let position = node
                    .owner
                    .and_then(|slides| self.node(slides).items.iter().position(|&s| s == id))
                    .ok_or_else(|| fault(codes::E_FAIL, "Slide is not in a presentation."))?;
                Ok(Value::Int(i32::try_from(position + 1).unwrap_or(i32::MAX)))
            }
            _ => node
                .props
                .get(member)
                .cloned()
                .ok_or_else(|| fault(codes::DISP_E_MEMBERNOTFOUND, "Member not found.")),
        }
    }

    fn put(&mut self, id: ObjectId, member: &str, value: Value) -> NativeResult<()> {
        self.check(id, member)?;
        if !self.node(id).props.contains_key(member) {
            return Err(fault(codes::DISP_E_MEMBERNOTFOUND, "Member not found."));
        }
        self.set(id, member, value);
        Ok(())
    }

    fn remove(&mut self, id: ObjectId) {
        if let Some(owner) = self.node(id).owner {
            self.node_mut(owner).items.retain(|&m| m != id);
        }
        let node = self.node_mut(id);
        node.deleted = true;
        node.owner = None;
    }

    fn edit_text(&mut self, id: ObjectId, edit: impl FnOnce(&str) -> String) -> NativeResult<Value> {
        let current = self
            .node(id)
            .props
            .get("Text")
            .and_then(Value::as_text)
            .ok_or_else(|| fault(codes::DISP_E_MEMBERNOTFOUND, "Member not found."))?
            .to_string();
        self.set(id, "Text", Value::Text(edit(&current)));
        Ok(Value::Nothing)
    }

    fn call(&mut self, id: ObjectId, method: &str, args: &[Value]) -> NativeResult<Value> {
        self.check(id, method)?;
        let class = self.node(id).class;
        let text_arg = || args.first().and_then(Value::as_text).unwrap_or_default().to_string();

        if let Some(member_class) = self.node(id).member_class {
            let count = self.node(id).items.len();
            if method == "Open" {
                if let Some(existing) = self.open_member(id, &text_arg()) {
                    return Ok(Value::Object(existing));
                }
            }
            match (member_class, method) {
                (_, "Item") => return self.item(id, args),
                ("Document", "Add") => {
                    let name = format!("Document{}", count + 1);
                    return Ok(Value::Object(self.document(id, &name, &[])));
                }
                ("Document", "Open") => {
                    let path = text_arg();
                    let name = path.rsplit(['\\', '/']).next().unwrap_or_default().to_string();
                    let doc = self.document(id, &name, &["Opened"]);
                    self.set(doc, "FullName", Value::Text(path));
                    return Ok(Value::Object(doc));
                }
                ("Paragraph", "Add") => return Ok(Value::Object(self.paragraph(id, ""))),
                ("Shape", "AddTextbox") => {
                    let name = format!("Text Box {}", count + 1);
                    return Ok(Value::Object(self.shape(id, &name)));
                }
                ("Presentation", "Add") => {
                    let name = format!("Presentation{}", count + 1);
                    return Ok(Value::Object(self.presentation(id, &name)));
                }
                ("Presentation", "Open") => {
                    let path = text_arg();
                    let name = path.rsplit(['\\', '/']).next().unwrap_or_default().to_string();
                    let pres = self.presentation(id, &name);
                    self.set(pres, "FullName", Value::Text(path));
                    return Ok(Value::Object(pres));
                }
                ("Slide", "Add") => {
                    let (Some(Value::Int(index)), Some(Value::Int(layout))) = (args.first(), args.get(1)) else {
                        return Err(fault(codes::DISP_E_BADINDEX, "Slides.Add needs an index and a layout."));
                    };
                    let position = usize::try_from(*index)
                        .ok()
                        .and_then(|i| i.checked_sub(1))
                        .filter(|p| *p <= count);
                    let Some(position) = position else {
                        self.out_of_range += 1;
                        return Err(fault(codes::DISP_E_BADINDEX, "Index out of range."));
                    };
                    return Ok(Value::Object(self.slide(id, position, *layout)));
                }
                _ => {}
            }
        }

        match (class, method) {
            ("Range", "Delete") => self.edit_text(id, |_| String::new()),
            (_, "Delete" | "Close") => {
                self.remove(id);
                Ok(Value::Nothing)
            }
            (_, "InsertAfter" | "TypeText") => {
                let text = text_arg();
                self.edit_text(id, |current| format!("{current}{text}"))
            }
            (_, "InsertBefore") => {
                let text = text_arg();
                self.edit_text(id, |current| format!("{text}{current}"))
            }
            (_, "Save") => {
                self.set(id, "Saved", Value::Bool(true));
                Ok(Value::Nothing)
            }
            (_, "SaveAs" | "SaveAs2") => {
                self.set(id, "FullName", Value::Text(text_arg()));
                self.set(id, "Saved", Value::Bool(true));
                Ok(Value::Nothing)
            }
            (_, "Activate") => Ok(Value::Nothing),
            ("Application", "Quit") => {
                self.set(id, "Quitting", Value::Bool(true));
                Ok(Value::Nothing)
            }
            ("Document", "Range") => {
                let bound = |i: usize| match args.get(i) {
                    Some(Value::Int(v)) => *v,
                    _ => 0,
                };
                let range = self.range(id, "");
                self.set(range, "Start", Value::Int(bound(0)));
                self.set(range, "End", Value::Int(bound(1)));
                Ok(Value::Object(range))
            }
            _ => Err(fault(codes::DISP_E_MEMBERNOTFOUND, "Unknown name.")),
        }
    }
}

/// One reference into a [`FakeHost`]. Released on drop.
pub struct FakeHandle {
    id: ObjectId,
    world: Rc<RefCell<World>>,
}

impl FakeHandle {
    fn acquire(world: &Rc<RefCell<World>>, id: ObjectId) -> Self {
        world.borrow_mut().node_mut(id).live += 1;
        Self {
            id,
            world: Rc::clone(world),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    fn lower(args: &[Variant<Self>]) -> Vec<Value> {
        args.iter().map(Self::lower_one).collect()
    }

    fn lower_one(value: &Variant<Self>) -> Value {
        match value {
            Variant::Empty | Variant::Null => Value::Nothing,
            Variant::Bool(b) => Value::Bool(*b),
            Variant::Int(i) => Value::Int(*i),
            Variant::Double(d) => Value::Double(*d),
            Variant::Text(s) => Value::Text(s.clone()),
            Variant::Date(d) => Value::Double(crate::convert::datetime_to_ole_date(*d)),
            Variant::Object(h) => Value::Object(h.id),
        }
    }

    fn raise(&self, value: Value) -> Variant<Self> {
        match value {
            Value::Nothing => Variant::Empty,
            Value::Bool(b) => Variant::Bool(b),
            Value::Int(i) => Variant::Int(i),
            Value::Double(d) => Variant::Double(d),
            Value::Text(s) => Variant::Text(s),
            Value::Object(id) => Variant::Object(Self::acquire(&self.world, id)),
        }
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        let mut world = self.world.borrow_mut();
        let node = world.node_mut(self.id);
        node.live -= 1;
        node.releases += 1;
    }
}

impl std::fmt::Debug for FakeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FakeHandle").field(&self.id).finish()
    }
}

impl NativeObject for FakeHandle {
    fn get(&self, member: &str, args: &[Variant<Self>]) -> NativeResult<Variant<Self>> {
        let value = self.world.borrow_mut().get(self.id, member, &Self::lower(args))?;
        Ok(self.raise(value))
    }

    fn put(&self, member: &str, value: &Variant<Self>) -> NativeResult<()> {
        self.world.borrow_mut().put(self.id, member, Self::lower_one(value))
    }

    fn call(&self, member: &str, args: &[Variant<Self>]) -> NativeResult<Variant<Self>> {
        let value = self.world.borrow_mut().call(self.id, member, &Self::lower(args))?;
        Ok(self.raise(value))
    }

    fn advise(&self, event: EventKind, sink: EventSink<Self>) -> NativeResult<u32> {
        let mut world = self.world.borrow_mut();
        world.check(self.id, "Advise")?;
        if world.node(self.id).class != "Application" {
            return Err(fault(codes::E_NOTIMPL, "No event source."));
        }
        world.next_cookie += 1;
        let cookie = world.next_cookie;
        world.subscriptions.push(Subscription {
            cookie,
            source: self.id,
            event,
            sink,
        });
        Ok(cookie)
    }

    fn unadvise(&self, cookie: u32) -> NativeResult<()> {
        let mut world = self.world.borrow_mut();
        world.check(self.id, "Unadvise")?;
        let before = world.subscriptions.len();
        world
            .subscriptions
            .retain(|s| !(s.cookie == cookie && s.source == self.id));
        if world.subscriptions.len() == before {
            return Err(fault(codes::CONNECT_E_NOCONNECTION, "No such connection."));
        }
        Ok(())
    }
}

/// An in-memory Word or PowerPoint instance.
pub struct FakeHost {
    kind: OfficeApp,
    app: ObjectId,
    world: Rc<RefCell<World>>,
}

impl FakeHost {
    pub fn word() -> Self {
        let mut world = World::default();
        let app = world.word_application();
        Self {
            kind: OfficeApp::Word,
            app,
            world: Rc::new(RefCell::new(world)),
        }
    }

    pub fn powerpoint() -> Self {
        let mut world = World::default();
        let app = world.powerpoint_application();
        Self {
            kind: OfficeApp::PowerPoint,
            app,
            world: Rc::new(RefCell::new(world)),
        }
    }

    /// Attaches a fresh [`Application`] wrapper to this host.
    pub fn application(&self) -> InteropResult<Application<FakeHandle>> {
        Application::new(Some(self.handle(self.app)), self.kind)
    }

    pub fn app_id(&self) -> ObjectId {
        self.app
    }

    /// A new reference to `id`, as the host would hand out.
    pub fn handle(&self, id: ObjectId) -> FakeHandle {
        FakeHandle::acquire(&self.world, id)
    }

    /// The object stored in `owner.member`, typically a collection.
    pub fn object(&self, owner: ObjectId, member: &str) -> ObjectId {
        self.property(owner, member)
            .and_then(|v| v.as_object())
            .unwrap_or_else(|| panic!("{member} is not an object property"))
    }

    pub fn add_document(&self, name: &str, paragraphs: &[&str]) -> ObjectId {
        let documents = self.object(self.app, "Documents");
        self.world.borrow_mut().document(documents, name, paragraphs)
    }

    pub fn add_presentation(&self, name: &str, slides: usize) -> ObjectId {
        let presentations = self.object(self.app, "Presentations");
        let mut world = self.world.borrow_mut();
        let pres = world.presentation(presentations, name);
        let slides_id = world.node(pres).props["Slides"].as_object().unwrap_or_default();
        for position in 0..slides {
            world.slide(slides_id, position, 12);
        }
        pres
    }

    /// Adds a text box to a document or slide.
    pub fn add_shape(&self, container: ObjectId, name: &str) -> ObjectId {
        let shapes = self.object(container, "Shapes");
        self.world.borrow_mut().shape(shapes, name)
    }

    /// Members of a collection, in order.
    pub fn members(&self, collection: ObjectId) -> Vec<ObjectId> {
        self.world.borrow().node(collection).items.clone()
    }

    /// `Name` of every member of a collection, in order.
    pub fn names(&self, collection: ObjectId) -> Vec<String> {
        let world = self.world.borrow();
        world
            .node(collection)
            .items
            .iter()
            .map(|&id| {
                world.node(id).props.get("Name").and_then(Value::as_text).unwrap_or_default().to_string()
            })
            .collect()
    }

    pub fn property(&self, id: ObjectId, member: &str) -> Option<Value> {
        self.world.borrow().node(id).props.get(member).cloned()
    }

    pub fn set_property(&self, id: ObjectId, member: &str, value: Value) {
        self.world.borrow_mut().set(id, member, value);
    }

    /// Makes every access to `id.member` fail with `code`.
    pub fn fail(&self, id: ObjectId, member: &str, code: i32) {
        self.world.borrow_mut().faults.insert((id, member.to_string()), code);
    }

    pub fn clear_fault(&self, id: ObjectId, member: &str) {
        self.world.borrow_mut().faults.remove(&(id, member.to_string()));
    }

    /// Raises `event` with the given objects as arguments, in order.
    pub fn fire(&self, event: EventKind, args: &[ObjectId]) {
        let sinks: Vec<EventSink<FakeHandle>> = self
            .world
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.event == event)
            .map(|s| Rc::clone(&s.sink))
            .collect();
        for sink in sinks {
            let values = args
                .iter()
                .map(|&id| Variant::Object(self.handle(id)))
                .collect();
            sink(values);
        }
    }

    /// Raises `event` with raw argument values.
    pub fn fire_raw(&self, event: EventKind, args: impl Fn() -> Vec<Variant<FakeHandle>>) {
        let sinks: Vec<EventSink<FakeHandle>> = self
            .world
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.event == event)
            .map(|s| Rc::clone(&s.sink))
            .collect();
        for sink in sinks {
            sink(args());
        }
    }

    /// Event registrations currently held by the host.
    pub fn subscriptions(&self) -> usize {
        self.world.borrow().subscriptions.len()
    }

    pub fn subscriptions_for(&self, event: EventKind) -> usize {
        self.world
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.event == event)
            .count()
    }

    /// Outstanding references to `id`.
    pub fn live_references(&self, id: ObjectId) -> usize {
        self.world.borrow().node(id).live
    }

    /// Outstanding references across the whole host.
    pub fn total_live_references(&self) -> usize {
        self.world.borrow().nodes.iter().map(|n| n.live).sum()
    }

    /// How many times a reference to `id` was released.
    pub fn releases(&self, id: ObjectId) -> usize {
        self.world.borrow().node(id).releases
    }

    /// Collection accesses the host rejected as out of range.
    pub fn out_of_range_accesses(&self) -> usize {
        self.world.borrow().out_of_range
    }

    pub fn is_deleted(&self, id: ObjectId) -> bool {
        self.world.borrow().node(id).deleted
    }
}

impl std::fmt::Debug for FakeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeHost")
            .field("kind", &self.kind)
            .field("objects", &self.world.borrow().nodes.len())
            .finish_non_exhaustive()
    }
}
