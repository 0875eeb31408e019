//! Logical element trees and their construction helper.
//!
//! Elements are immutable descriptions of what the host tree should look
//! like. The construction functions normalize variadic/nested children into
//! a flat ordered sequence and wrap bare primitives as text elements;
//! anything else surfaces as a [`ElementError`] synchronously, never from
//! inside a walk.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::component::ComponentType;

/// Ordered property snapshot: insertion-ordered mapping with unique keys.
pub type Props = IndexMap<String, PropValue>;

/// Host type name of a text element.
pub const TEXT_TYPE: &str = "#text";
/// Prop under which a text element carries its character data.
pub const TEXT_VALUE_PROP: &str = "nodeValue";
/// Prop holding the nested style mapping.
pub const STYLE_PROP: &str = "style";

/// Props whose name signals an event are routed to host listeners.
pub fn is_listener_prop(name: &str) -> bool {
    name.starts_with("on")
}

pub fn is_style_prop(name: &str) -> bool {
    name == STYLE_PROP
}

pub fn is_attribute_prop(name: &str) -> bool {
    !is_listener_prop(name) && !is_style_prop(name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Callback prop. Equality is pointer equality, matching the
/// reference-identity semantics props rely on elsewhere.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn invoke(&self, event: &Event) {
        (self.0)(event);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Style(IndexMap<String, String>),
    Handler(EventHandler),
}

impl PropValue {
    /// Text rendition of a primitive value; `None` for handlers and style
    /// maps, which have no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PropValue::Text(value) => Some(value.clone()),
            PropValue::Number(value) => Some(format!("{value}")),
            PropValue::Bool(value) => Some(format!("{value}")),
            PropValue::Style(_) | PropValue::Handler(_) => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            PropValue::Text(_) => "text",
            PropValue::Number(_) => "number",
            PropValue::Bool(_) => "bool",
            PropValue::Style(_) => "style map",
            PropValue::Handler(_) => "event handler",
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_owned())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<IndexMap<String, String>> for PropValue {
    fn from(value: IndexMap<String, String>) -> Self {
        PropValue::Style(value)
    }
}

/// Builds a [`Props`] map from `name => value` pairs.
#[macro_export]
macro_rules! props {
    () => { $crate::element::Props::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::element::Props::new();
        $(map.insert(::std::string::String::from($name), $crate::element::PropValue::from($value));)+
        map
    }};
}

#[derive(Clone)]
pub enum ElementKind {
    /// Intrinsic host element named by its type string.
    Host(String),
    /// Stateful component instance of the given type.
    Component(ComponentType),
}

impl ElementKind {
    pub fn same_type(&self, other: &ElementKind) -> bool {
        match (self, other) {
            (ElementKind::Host(a), ElementKind::Host(b)) => a == b,
            (ElementKind::Component(a), ElementKind::Component(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Host(ty) => write!(f, "Host({ty})"),
            ElementKind::Component(ty) => write!(f, "Component({})", ty.name()),
        }
    }
}

/// One node of a logical element tree. Cheap to clone; props and children
/// are shared snapshots, and that sharing is what the reconciler's bail-out
/// reference-identity test observes.
#[derive(Clone)]
pub struct Element {
    pub(crate) kind: ElementKind,
    pub(crate) props: Rc<Props>,
    pub(crate) children: Rc<Vec<Element>>,
}

impl Element {
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub(crate) fn props_rc(&self) -> &Rc<Props> {
        &self.props
    }

    pub(crate) fn children_rc(&self) -> &Rc<Vec<Element>> {
        &self.children
    }

    pub fn host_type(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Host(ty) => Some(ty),
            ElementKind::Component(_) => None,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("props", &self.props)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Child argument accepted by the construction helpers.
pub enum Child {
    Node(Element),
    Value(PropValue),
    List(Vec<Child>),
}

impl From<Element> for Child {
    fn from(value: Element) -> Self {
        Child::Node(value)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Value(PropValue::from(value))
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Value(PropValue::from(value))
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Value(PropValue::from(value))
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Value(PropValue::from(value))
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Value(PropValue::from(value))
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        Child::Value(PropValue::from(value))
    }
}

impl From<PropValue> for Child {
    fn from(value: PropValue) -> Self {
        Child::Value(value)
    }
}

impl From<Vec<Child>> for Child {
    fn from(value: Vec<Child>) -> Self {
        Child::List(value)
    }
}

impl From<Vec<Element>> for Child {
    fn from(value: Vec<Element>) -> Self {
        Child::List(value.into_iter().map(Child::Node).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    /// A child is neither an element nor a primitive convertible to text.
    MalformedChild { detail: String },
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementError::MalformedChild { detail } => {
                write!(f, "malformed child: {detail}")
            }
        }
    }
}

impl std::error::Error for ElementError {}

/// Flattens nested child lists and wraps bare primitives as text elements.
pub fn normalize_children(
    children: impl IntoIterator<Item = Child>,
) -> Result<Vec<Element>, ElementError> {
    let mut flat = Vec::new();
    push_children(&mut flat, children)?;
    Ok(flat)
}

fn push_children(
    flat: &mut Vec<Element>,
    children: impl IntoIterator<Item = Child>,
) -> Result<(), ElementError> {
    for child in children {
        match child {
            Child::Node(element) => flat.push(element),
            Child::Value(value) => match value.as_text() {
                Some(text) => flat.push(text_element(text)),
                None => {
                    return Err(ElementError::MalformedChild {
                        detail: format!("{} is not convertible to text", value.describe()),
                    })
                }
            },
            Child::List(nested) => push_children(flat, nested)?,
        }
    }
    Ok(())
}

/// Builds an intrinsic host element.
pub fn host_element(
    ty: impl Into<String>,
    props: Props,
    children: impl IntoIterator<Item = Child>,
) -> Result<Element, ElementError> {
    Ok(Element {
        kind: ElementKind::Host(ty.into()),
        props: Rc::new(props),
        children: Rc::new(normalize_children(children)?),
    })
}

/// Builds a stateful-component element.
pub fn component_element(
    ty: &ComponentType,
    props: Props,
    children: impl IntoIterator<Item = Child>,
) -> Result<Element, ElementError> {
    Ok(Element {
        kind: ElementKind::Component(ty.clone()),
        props: Rc::new(props),
        children: Rc::new(normalize_children(children)?),
    })
}

/// Builds a text element carrying `value` under [`TEXT_VALUE_PROP`].
pub fn text_element(value: impl Into<String>) -> Element {
    let mut props = Props::new();
    props.insert(TEXT_VALUE_PROP.to_owned(), PropValue::Text(value.into()));
    Element {
        kind: ElementKind::Host(TEXT_TYPE.to_owned()),
        props: Rc::new(props),
        children: Rc::new(Vec::new()),
    }
}

pub(crate) fn props_equal(a: &Rc<Props>, b: &Rc<Props>) -> bool {
    Rc::ptr_eq(a, b) || **a == **b
}
