//! The in-memory tag tree.
//!
//! [`NbtTag`] is a handle to a node in the tree. Handles are reference
//! counted: the children container of a list or compound uniquely owns its
//! children, while the parent edge is a weak back reference, so no
//! ownership cycles can form. Tags are created detached; adding one to a
//! compound or list establishes the parent link and enforces the
//! structural rules (single parent, unique names within a compound,
//! uniform list element type, unnamed list elements, no cycles).
//!
//! `Clone` produces a deep, fully detached copy. Equality is structural
//! (names, types, values, list order); identity is [`NbtTag::same`].

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config;
use crate::error::{Error, Result};
use crate::Tag;

pub struct NbtTag {
    node: Rc<RefCell<Node>>,
}

struct Node {
    name: Option<String>,
    parent: Option<Weak<RefCell<Node>>>,
    payload: Payload,
}

pub(crate) enum Payload {
    Byte(u8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    ByteArray(Vec<u8>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    /// `element: None` is the in-memory undetermined state of an empty
    /// list; it is never written to the wire.
    List {
        element: Option<Tag>,
        items: Vec<NbtTag>,
    },
    Compound(Vec<NbtTag>),
}

impl Payload {
    fn kind(&self) -> Tag {
        match self {
            Payload::Byte(_) => Tag::Byte,
            Payload::Short(_) => Tag::Short,
            Payload::Int(_) => Tag::Int,
            Payload::Long(_) => Tag::Long,
            Payload::Float(_) => Tag::Float,
            Payload::Double(_) => Tag::Double,
            Payload::String(_) => Tag::String,
            Payload::ByteArray(_) => Tag::ByteArray,
            Payload::IntArray(_) => Tag::IntArray,
            Payload::LongArray(_) => Tag::LongArray,
            Payload::List { .. } => Tag::List,
            Payload::Compound(_) => Tag::Compound,
        }
    }
}

macro_rules! scalar_constructors {
    ($(($ctor:ident, $named:ident, $variant:ident, $ty:ty)),+ $(,)?) => {
        $(
            pub fn $ctor(v: $ty) -> NbtTag {
                NbtTag::from_payload(Payload::$variant(v))
            }

            pub fn $named(name: impl Into<String>, v: $ty) -> NbtTag {
                let tag = NbtTag::$ctor(v);
                tag.node.borrow_mut().name = Some(name.into());
                tag
            }
        )+
    };
}

/// Constructors. Every tag starts detached and optionally named; the
/// `named_*` variants are sugar for naming at creation time.
impl NbtTag {
    fn from_payload(payload: Payload) -> NbtTag {
        NbtTag {
            node: Rc::new(RefCell::new(Node {
                name: None,
                parent: None,
                payload,
            })),
        }
    }

    scalar_constructors!(
        (byte, named_byte, Byte, u8),
        (short, named_short, Short, i16),
        (int, named_int, Int, i32),
        (long, named_long, Long, i64),
        (float, named_float, Float, f32),
        (double, named_double, Double, f64),
    );

    pub fn string(v: impl Into<String>) -> NbtTag {
        NbtTag::from_payload(Payload::String(v.into()))
    }

    pub fn named_string(name: impl Into<String>, v: impl Into<String>) -> NbtTag {
        let tag = NbtTag::string(v);
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }

    pub fn byte_array(v: impl Into<Vec<u8>>) -> NbtTag {
        NbtTag::from_payload(Payload::ByteArray(v.into()))
    }

    pub fn named_byte_array(name: impl Into<String>, v: impl Into<Vec<u8>>) -> NbtTag {
        let tag = NbtTag::byte_array(v);
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }

    pub fn int_array(v: impl Into<Vec<i32>>) -> NbtTag {
        NbtTag::from_payload(Payload::IntArray(v.into()))
    }

    pub fn named_int_array(name: impl Into<String>, v: impl Into<Vec<i32>>) -> NbtTag {
        let tag = NbtTag::int_array(v);
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }

    pub fn long_array(v: impl Into<Vec<i64>>) -> NbtTag {
        NbtTag::from_payload(Payload::LongArray(v.into()))
    }

    pub fn named_long_array(name: impl Into<String>, v: impl Into<Vec<i64>>) -> NbtTag {
        let tag = NbtTag::long_array(v);
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }

    /// An empty list with an undetermined element type. The first element
    /// added fixes the type.
    pub fn list() -> NbtTag {
        NbtTag::from_payload(Payload::List {
            element: None,
            items: Vec::new(),
        })
    }

    pub fn named_list(name: impl Into<String>) -> NbtTag {
        let tag = NbtTag::list();
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }

    /// An empty list with a fixed element type. `Tag::End` is accepted for
    /// compatibility with historical files and round-trips verbatim.
    pub fn list_of(element: Tag) -> NbtTag {
        NbtTag::from_payload(Payload::List {
            element: Some(element),
            items: Vec::new(),
        })
    }

    pub fn named_list_of(name: impl Into<String>, element: Tag) -> NbtTag {
        let tag = NbtTag::list_of(element);
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }

    pub fn compound() -> NbtTag {
        NbtTag::from_payload(Payload::Compound(Vec::new()))
    }

    pub fn named_compound(name: impl Into<String>) -> NbtTag {
        let tag = NbtTag::compound();
        tag.node.borrow_mut().name = Some(name.into());
        tag
    }
}

/// Identity, naming and the parent chain.
impl NbtTag {
    /// Another handle to the same node. Mutation through either handle is
    /// visible through both. Contrast with `clone`, which deep-copies.
    pub(crate) fn alias(&self) -> NbtTag {
        NbtTag {
            node: Rc::clone(&self.node),
        }
    }

    /// True when both handles refer to the same node.
    pub fn same(a: &NbtTag, b: &NbtTag) -> bool {
        Rc::ptr_eq(&a.node, &b.node)
    }

    pub fn kind(&self) -> Tag {
        self.node.borrow().payload.kind()
    }

    pub fn name(&self) -> Option<String> {
        self.node.borrow().name.clone()
    }

    pub fn has_name(&self) -> bool {
        self.node.borrow().name.is_some()
    }

    /// The owning list or compound, if any.
    pub fn parent(&self) -> Option<NbtTag> {
        self.node
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|node| NbtTag { node })
    }

    /// Rename this tag. Inside a compound the new name must not collide
    /// with a sibling; inside a list tags cannot be named at all.
    pub fn rename(&self, name: impl Into<String>) -> Result<()> {
        self.set_name(Some(name.into()))
    }

    /// Remove this tag's name. Fails for tags owned by a compound, which
    /// must stay named.
    pub fn clear_name(&self) -> Result<()> {
        self.set_name(None)
    }

    fn set_name(&self, name: Option<String>) -> Result<()> {
        if let Some(parent) = self.parent() {
            match parent.kind() {
                Tag::Compound => {
                    let new = name.as_deref().ok_or_else(|| {
                        Error::invalid_argument("tags owned by a compound must be named")
                    })?;
                    let node = parent.node.borrow();
                    if let Payload::Compound(children) = &node.payload {
                        for child in children {
                            if !Rc::ptr_eq(&child.node, &self.node)
                                && child.node.borrow().name.as_deref() == Some(new)
                            {
                                return Err(Error::invalid_argument(format!(
                                    "a tag named \"{}\" already exists in the compound",
                                    new
                                )));
                            }
                        }
                    }
                }
                Tag::List => {
                    if name.is_some() {
                        return Err(Error::invalid_argument("list elements are unnamed"));
                    }
                }
                _ => {}
            }
        }
        self.node.borrow_mut().name = name;
        Ok(())
    }

    /// Dotted/bracketed location of this tag within its root: a child of a
    /// compound contributes `.name`, a child of a list `[index]`. The root
    /// contributes its own name (possibly empty).
    pub fn path(&self) -> String {
        match self.parent() {
            None => self.name().unwrap_or_default(),
            Some(parent) => match parent.kind() {
                Tag::List => {
                    let index = parent
                        .index_of(self)
                        .ok()
                        .flatten()
                        .map(|i| i.to_string())
                        .unwrap_or_default();
                    format!("{}[{}]", parent.path(), index)
                }
                _ => format!("{}.{}", parent.path(), self.name().unwrap_or_default()),
            },
        }
    }

    fn not_a(&self, what: &str) -> Error {
        Error::TypeMismatch(format!("{:?} tag is not a {}", self.kind(), what))
    }
}

/// Widening value accessors. Each succeeds for the source types listed in
/// its doc and fails with a type mismatch for everything else.
impl NbtTag {
    /// `Byte` only.
    pub fn as_byte(&self) -> Result<u8> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(*v),
            p => Err(Error::type_mismatch(p.kind(), "byte")),
        }
    }

    /// `Byte` and `Short`.
    pub fn as_short(&self) -> Result<i16> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(*v as i16),
            Payload::Short(v) => Ok(*v),
            p => Err(Error::type_mismatch(p.kind(), "short")),
        }
    }

    /// `Byte`, `Short` and `Int`.
    pub fn as_int(&self) -> Result<i32> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(*v as i32),
            Payload::Short(v) => Ok(*v as i32),
            Payload::Int(v) => Ok(*v),
            p => Err(Error::type_mismatch(p.kind(), "int")),
        }
    }

    /// `Byte`, `Short`, `Int` and `Long`.
    pub fn as_long(&self) -> Result<i64> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(*v as i64),
            Payload::Short(v) => Ok(*v as i64),
            Payload::Int(v) => Ok(*v as i64),
            Payload::Long(v) => Ok(*v),
            p => Err(Error::type_mismatch(p.kind(), "long")),
        }
    }

    /// All numeric types. `Long` loses precision, `Double` narrows.
    pub fn as_float(&self) -> Result<f32> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(*v as f32),
            Payload::Short(v) => Ok(*v as f32),
            Payload::Int(v) => Ok(*v as f32),
            Payload::Long(v) => Ok(*v as f32),
            Payload::Float(v) => Ok(*v),
            Payload::Double(v) => Ok(*v as f32),
            p => Err(Error::type_mismatch(p.kind(), "float")),
        }
    }

    /// All numeric types. `Long` loses precision beyond 2^53.
    pub fn as_double(&self) -> Result<f64> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(*v as f64),
            Payload::Short(v) => Ok(*v as f64),
            Payload::Int(v) => Ok(*v as f64),
            Payload::Long(v) => Ok(*v as f64),
            Payload::Float(v) => Ok(*v as f64),
            Payload::Double(v) => Ok(*v),
            p => Err(Error::type_mismatch(p.kind(), "double")),
        }
    }

    /// Any scalar; numeric values are rendered in decimal.
    pub fn as_string(&self) -> Result<String> {
        match &self.node.borrow().payload {
            Payload::Byte(v) => Ok(v.to_string()),
            Payload::Short(v) => Ok(v.to_string()),
            Payload::Int(v) => Ok(v.to_string()),
            Payload::Long(v) => Ok(v.to_string()),
            Payload::Float(v) => Ok(v.to_string()),
            Payload::Double(v) => Ok(v.to_string()),
            Payload::String(v) => Ok(v.clone()),
            p => Err(Error::type_mismatch(p.kind(), "string")),
        }
    }
}

/// Scalar setters, exact type only.
impl NbtTag {
    pub fn set_byte(&self, v: u8) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::Byte(slot) => {
                *slot = v;
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "byte")),
        }
    }

    pub fn set_short(&self, v: i16) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::Short(slot) => {
                *slot = v;
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "short")),
        }
    }

    pub fn set_int(&self, v: i32) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::Int(slot) => {
                *slot = v;
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "int")),
        }
    }

    pub fn set_long(&self, v: i64) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::Long(slot) => {
                *slot = v;
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "long")),
        }
    }

    pub fn set_float(&self, v: f32) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::Float(slot) => {
                *slot = v;
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "float")),
        }
    }

    pub fn set_double(&self, v: f64) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::Double(slot) => {
                *slot = v;
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "double")),
        }
    }

    pub fn set_string(&self, v: impl Into<String>) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::String(slot) => {
                *slot = v.into();
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "string")),
        }
    }

    pub fn set_bytes(&self, v: impl Into<Vec<u8>>) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::ByteArray(slot) => {
                *slot = v.into();
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "byte array")),
        }
    }

    pub fn set_ints(&self, v: impl Into<Vec<i32>>) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::IntArray(slot) => {
                *slot = v.into();
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "int array")),
        }
    }

    pub fn set_longs(&self, v: impl Into<Vec<i64>>) -> Result<()> {
        match &mut self.node.borrow_mut().payload {
            Payload::LongArray(slot) => {
                *slot = v.into();
                Ok(())
            }
            p => Err(Error::type_mismatch(p.kind(), "long array")),
        }
    }
}

/// Array payload access. The guards borrow the node; drop them before
/// mutating the same tag through another call.
impl NbtTag {
    pub fn bytes(&self) -> Result<Ref<'_, [u8]>> {
        Ref::filter_map(self.node.borrow(), |n| match &n.payload {
            Payload::ByteArray(v) => Some(v.as_slice()),
            _ => None,
        })
        .map_err(|_| self.not_a("byte array"))
    }

    pub fn bytes_mut(&self) -> Result<RefMut<'_, Vec<u8>>> {
        RefMut::filter_map(self.node.borrow_mut(), |n| match &mut n.payload {
            Payload::ByteArray(v) => Some(v),
            _ => None,
        })
        .map_err(|n| Error::type_mismatch(n.payload.kind(), "byte array"))
    }

    pub fn ints(&self) -> Result<Ref<'_, [i32]>> {
        Ref::filter_map(self.node.borrow(), |n| match &n.payload {
            Payload::IntArray(v) => Some(v.as_slice()),
            _ => None,
        })
        .map_err(|_| self.not_a("int array"))
    }

    pub fn ints_mut(&self) -> Result<RefMut<'_, Vec<i32>>> {
        RefMut::filter_map(self.node.borrow_mut(), |n| match &mut n.payload {
            Payload::IntArray(v) => Some(v),
            _ => None,
        })
        .map_err(|n| Error::type_mismatch(n.payload.kind(), "int array"))
    }

    pub fn longs(&self) -> Result<Ref<'_, [i64]>> {
        Ref::filter_map(self.node.borrow(), |n| match &n.payload {
            Payload::LongArray(v) => Some(v.as_slice()),
            _ => None,
        })
        .map_err(|_| self.not_a("long array"))
    }

    pub fn longs_mut(&self) -> Result<RefMut<'_, Vec<i64>>> {
        RefMut::filter_map(self.node.borrow_mut(), |n| match &mut n.payload {
            Payload::LongArray(v) => Some(v),
            _ => None,
        })
        .map_err(|n| Error::type_mismatch(n.payload.kind(), "long array"))
    }

    pub fn string_value(&self) -> Result<Ref<'_, str>> {
        Ref::filter_map(self.node.borrow(), |n| match &n.payload {
            Payload::String(v) => Some(v.as_str()),
            _ => None,
        })
        .map_err(|_| self.not_a("string"))
    }
}

/// Container operations. `add`, `insert` and `set_at` take ownership of a
/// detached tag; removal detaches and returns the handle.
impl NbtTag {
    /// Element count of a list, compound or array tag.
    pub fn len(&self) -> Result<usize> {
        match &self.node.borrow().payload {
            Payload::List { items, .. } => Ok(items.len()),
            Payload::Compound(items) => Ok(items.len()),
            Payload::ByteArray(v) => Ok(v.len()),
            Payload::IntArray(v) => Ok(v.len()),
            Payload::LongArray(v) => Ok(v.len()),
            p => Err(Error::type_mismatch(p.kind(), "container or array")),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The list's element type, `None` while undetermined.
    pub fn element_type(&self) -> Result<Option<Tag>> {
        match &self.node.borrow().payload {
            Payload::List { element, .. } => Ok(*element),
            _ => Err(self.not_a("list")),
        }
    }

    /// Fix or change the list's element type. Free while the list is
    /// empty (including `Some(Tag::End)` and back to `None`); once an
    /// element is present only the current type is accepted.
    pub fn set_element_type(&self, element: Option<Tag>) -> Result<()> {
        if self.kind() != Tag::List {
            return Err(self.not_a("list"));
        }
        match &mut self.node.borrow_mut().payload {
            Payload::List {
                element: slot,
                items,
            } => {
                if !items.is_empty() && element != *slot {
                    return Err(Error::invalid_argument(
                        "cannot change the element type of a non-empty list",
                    ));
                }
                *slot = element;
                Ok(())
            }
            _ => unreachable!(),
        }
    }

    /// Append a child. For compounds the child must be named and the name
    /// unique; for lists the child must be unnamed and match the element
    /// type (the first element fixes an undetermined type). The container
    /// takes ownership of the node; the caller's handle stays valid and
    /// aliases the stored child.
    pub fn add(&self, child: &NbtTag) -> Result<()> {
        match self.kind() {
            Tag::Compound => self.compound_insert(None, child),
            Tag::List => self.list_insert(None, child),
            _ => Err(self.not_a("container")),
        }
    }

    /// Insert a list element at `index`.
    pub fn insert(&self, index: usize, child: &NbtTag) -> Result<()> {
        if self.kind() != Tag::List {
            return Err(self.not_a("list"));
        }
        self.list_insert(Some(index), child)
    }

    /// Replace the list element at `index`, returning the detached old
    /// element.
    pub fn set_at(&self, index: usize, child: &NbtTag) -> Result<NbtTag> {
        if self.kind() != Tag::List {
            return Err(self.not_a("list"));
        }
        self.check_list_child(child)?;
        self.check_attachable(child)?;
        let old = {
            let mut node = self.node.borrow_mut();
            match &mut node.payload {
                Payload::List { items, .. } => {
                    if index >= items.len() {
                        return Err(Error::invalid_argument(format!(
                            "index {} out of bounds for list of {}",
                            index,
                            items.len()
                        )));
                    }
                    std::mem::replace(&mut items[index], child.alias())
                }
                _ => unreachable!(),
            }
        };
        old.node.borrow_mut().parent = None;
        child.node.borrow_mut().parent = Some(Rc::downgrade(&self.node));
        Ok(old)
    }

    /// List element at `index`, as a shared handle.
    pub fn get(&self, index: usize) -> Result<NbtTag> {
        match &self.node.borrow().payload {
            Payload::List { items, .. } => items
                .get(index)
                .map(NbtTag::alias)
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "index {} out of bounds for list of {}",
                        index,
                        items.len()
                    ))
                }),
            _ => Err(self.not_a("list")),
        }
    }

    /// Compound child by name, as a shared handle.
    pub fn get_named(&self, name: &str) -> Result<Option<NbtTag>> {
        match &self.node.borrow().payload {
            Payload::Compound(items) => Ok(items
                .iter()
                .find(|t| t.node.borrow().name.as_deref() == Some(name))
                .map(NbtTag::alias)),
            _ => Err(self.not_a("compound")),
        }
    }

    /// Insert into a compound under `name`, replacing (and returning) any
    /// existing child of that name. The tag is renamed to `name`.
    pub fn put(&self, name: &str, child: &NbtTag) -> Result<Option<NbtTag>> {
        if self.kind() != Tag::Compound {
            return Err(self.not_a("compound"));
        }
        self.check_attachable(child)?;
        child.node.borrow_mut().name = Some(name.to_owned());
        let old = self.remove_named(name)?;
        self.compound_insert(None, child)?;
        Ok(old)
    }

    /// Remove a compound child by name, returning the detached tag.
    pub fn remove_named(&self, name: &str) -> Result<Option<NbtTag>> {
        if self.kind() != Tag::Compound {
            return Err(self.not_a("compound"));
        }
        let removed = match &mut self.node.borrow_mut().payload {
            Payload::Compound(items) => {
                let pos = items
                    .iter()
                    .position(|t| t.node.borrow().name.as_deref() == Some(name));
                pos.map(|i| items.remove(i))
            }
            _ => unreachable!(),
        };
        if let Some(tag) = &removed {
            tag.node.borrow_mut().parent = None;
        }
        Ok(removed)
    }

    /// Remove a child by identity from a list or compound. Returns whether
    /// it was present.
    pub fn remove(&self, child: &NbtTag) -> Result<bool> {
        if !self.kind().is_container() {
            return Err(self.not_a("container"));
        }
        let removed = {
            let mut node = self.node.borrow_mut();
            let items = match &mut node.payload {
                Payload::List { items, .. } => items,
                Payload::Compound(items) => items,
                _ => unreachable!(),
            };
            match items.iter().position(|t| Rc::ptr_eq(&t.node, &child.node)) {
                Some(i) => {
                    items.remove(i);
                    true
                }
                None => false,
            }
        };
        if removed {
            child.node.borrow_mut().parent = None;
        }
        Ok(removed)
    }

    /// Remove the list element at `index`, returning the detached tag.
    pub fn remove_at(&self, index: usize) -> Result<NbtTag> {
        if self.kind() != Tag::List {
            return Err(self.not_a("list"));
        }
        let tag = {
            let mut node = self.node.borrow_mut();
            match &mut node.payload {
                Payload::List { items, .. } => {
                    if index >= items.len() {
                        return Err(Error::invalid_argument(format!(
                            "index {} out of bounds for list of {}",
                            index,
                            items.len()
                        )));
                    }
                    items.remove(index)
                }
                _ => unreachable!(),
            }
        };
        tag.node.borrow_mut().parent = None;
        Ok(tag)
    }

    /// Detach every child of a list or compound.
    pub fn clear(&self) -> Result<()> {
        if !self.kind().is_container() {
            return Err(self.not_a("container"));
        }
        let children = {
            let mut node = self.node.borrow_mut();
            match &mut node.payload {
                Payload::List { items, .. } => std::mem::take(items),
                Payload::Compound(items) => std::mem::take(items),
                _ => unreachable!(),
            }
        };
        for child in &children {
            child.node.borrow_mut().parent = None;
        }
        Ok(())
    }

    /// Position of `child` within this list, by identity.
    pub fn index_of(&self, child: &NbtTag) -> Result<Option<usize>> {
        match &self.node.borrow().payload {
            Payload::List { items, .. } => {
                Ok(items.iter().position(|t| Rc::ptr_eq(&t.node, &child.node)))
            }
            _ => Err(self.not_a("list")),
        }
    }

    /// Whether `child` is a direct child of this container, by identity.
    pub fn contains(&self, child: &NbtTag) -> Result<bool> {
        match &self.node.borrow().payload {
            Payload::List { items, .. } | Payload::Compound(items) => {
                Ok(items.iter().any(|t| Rc::ptr_eq(&t.node, &child.node)))
            }
            _ => Err(self.not_a("container")),
        }
    }

    /// Whether this compound has a child of the given name.
    pub fn contains_named(&self, name: &str) -> Result<bool> {
        match &self.node.borrow().payload {
            Payload::Compound(items) => Ok(items
                .iter()
                .any(|t| t.node.borrow().name.as_deref() == Some(name))),
            _ => Err(self.not_a("compound")),
        }
    }

    /// The names of this compound's children, in insertion order.
    pub fn names(&self) -> Result<Vec<String>> {
        match &self.node.borrow().payload {
            Payload::Compound(items) => Ok(items
                .iter()
                .filter_map(|t| t.node.borrow().name.clone())
                .collect()),
            _ => Err(self.not_a("compound")),
        }
    }

    /// Handles to this container's children, in order.
    pub fn tags(&self) -> Result<Vec<NbtTag>> {
        match &self.node.borrow().payload {
            Payload::List { items, .. } | Payload::Compound(items) => {
                Ok(items.iter().map(NbtTag::alias).collect())
            }
            _ => Err(self.not_a("container")),
        }
    }

    fn compound_insert(&self, index: Option<usize>, child: &NbtTag) -> Result<()> {
        self.check_attachable(child)?;
        {
            let child_node = child.node.borrow();
            let name = child_node.name.as_deref().ok_or_else(|| {
                Error::invalid_argument("tags added to a compound must be named")
            })?;
            let node = self.node.borrow();
            if let Payload::Compound(items) = &node.payload {
                for item in items {
                    if item.node.borrow().name.as_deref() == Some(name) {
                        return Err(Error::invalid_argument(format!(
                            "a tag named \"{}\" already exists in the compound",
                            name
                        )));
                    }
                }
            }
        }
        child.node.borrow_mut().parent = Some(Rc::downgrade(&self.node));
        match &mut self.node.borrow_mut().payload {
            Payload::Compound(items) => match index {
                Some(i) => items.insert(i, child.alias()),
                None => items.push(child.alias()),
            },
            _ => unreachable!(),
        }
        Ok(())
    }

    fn list_insert(&self, index: Option<usize>, child: &NbtTag) -> Result<()> {
        self.check_attachable(child)?;
        self.check_list_child(child)?;
        let kind = child.kind();
        child.node.borrow_mut().parent = Some(Rc::downgrade(&self.node));
        match &mut self.node.borrow_mut().payload {
            Payload::List { element, items } => {
                if element.is_none() {
                    *element = Some(kind);
                }
                match index {
                    Some(i) => {
                        if i > items.len() {
                            child.node.borrow_mut().parent = None;
                            return Err(Error::invalid_argument(format!(
                                "index {} out of bounds for list of {}",
                                i,
                                items.len()
                            )));
                        }
                        items.insert(i, child.alias());
                    }
                    None => items.push(child.alias()),
                }
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    fn check_list_child(&self, child: &NbtTag) -> Result<()> {
        if child.has_name() {
            return Err(Error::invalid_argument("list elements must be unnamed"));
        }
        if let Payload::List {
            element: Some(element),
            ..
        } = &self.node.borrow().payload
        {
            if child.kind() != *element {
                return Err(Error::invalid_argument(format!(
                    "list of {:?} cannot hold a {:?} tag",
                    element,
                    child.kind()
                )));
            }
        }
        Ok(())
    }

    /// Single-parent and acyclicity checks shared by every attach path.
    fn check_attachable(&self, child: &NbtTag) -> Result<()> {
        if child.node.borrow().parent.is_some() {
            return Err(Error::invalid_argument(
                "tag already has a parent; remove it from its current container first",
            ));
        }
        let mut cursor = Some(self.alias());
        while let Some(tag) = cursor {
            if Rc::ptr_eq(&tag.node, &child.node) {
                return Err(Error::invalid_argument(
                    "a tag may not become a descendant of itself",
                ));
            }
            cursor = tag.parent();
        }
        Ok(())
    }
}

impl Clone for NbtTag {
    /// Deep copy. The copy is fully detached and keeps names all the way
    /// down.
    fn clone(&self) -> Self {
        let node = self.node.borrow();
        let tag = match &node.payload {
            Payload::Byte(v) => NbtTag::from_payload(Payload::Byte(*v)),
            Payload::Short(v) => NbtTag::from_payload(Payload::Short(*v)),
            Payload::Int(v) => NbtTag::from_payload(Payload::Int(*v)),
            Payload::Long(v) => NbtTag::from_payload(Payload::Long(*v)),
            Payload::Float(v) => NbtTag::from_payload(Payload::Float(*v)),
            Payload::Double(v) => NbtTag::from_payload(Payload::Double(*v)),
            Payload::String(v) => NbtTag::from_payload(Payload::String(v.clone())),
            Payload::ByteArray(v) => NbtTag::from_payload(Payload::ByteArray(v.clone())),
            Payload::IntArray(v) => NbtTag::from_payload(Payload::IntArray(v.clone())),
            Payload::LongArray(v) => NbtTag::from_payload(Payload::LongArray(v.clone())),
            Payload::List { element, items } => {
                let copy = NbtTag::from_payload(Payload::List {
                    element: *element,
                    items: Vec::with_capacity(items.len()),
                });
                for item in items {
                    let child = item.clone();
                    child.node.borrow_mut().parent = Some(Rc::downgrade(&copy.node));
                    if let Payload::List { items, .. } = &mut copy.node.borrow_mut().payload {
                        items.push(child);
                    }
                }
                copy
            }
            Payload::Compound(items) => {
                let copy = NbtTag::from_payload(Payload::Compound(Vec::with_capacity(items.len())));
                for item in items {
                    let child = item.clone();
                    child.node.borrow_mut().parent = Some(Rc::downgrade(&copy.node));
                    if let Payload::Compound(items) = &mut copy.node.borrow_mut().payload {
                        items.push(child);
                    }
                }
                copy
            }
        };
        tag.node.borrow_mut().name = node.name.clone();
        tag
    }
}

impl PartialEq for NbtTag {
    /// Structural equality: names, types and values, list order included.
    /// Compound children compare as an unordered, name-keyed set. Parent
    /// links are ignored. Use [`NbtTag::same`] for identity.
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        let a = self.node.borrow();
        let b = other.node.borrow();
        if a.name != b.name {
            return false;
        }
        match (&a.payload, &b.payload) {
            (Payload::Byte(x), Payload::Byte(y)) => x == y,
            (Payload::Short(x), Payload::Short(y)) => x == y,
            (Payload::Int(x), Payload::Int(y)) => x == y,
            (Payload::Long(x), Payload::Long(y)) => x == y,
            (Payload::Float(x), Payload::Float(y)) => x == y,
            (Payload::Double(x), Payload::Double(y)) => x == y,
            (Payload::String(x), Payload::String(y)) => x == y,
            (Payload::ByteArray(x), Payload::ByteArray(y)) => x == y,
            (Payload::IntArray(x), Payload::IntArray(y)) => x == y,
            (Payload::LongArray(x), Payload::LongArray(y)) => x == y,
            (
                Payload::List {
                    element: ea,
                    items: xs,
                },
                Payload::List {
                    element: eb,
                    items: ys,
                },
            ) => ea == eb && xs == ys,
            (Payload::Compound(xs), Payload::Compound(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|x| {
                        let name = x.node.borrow().name.clone();
                        ys.iter()
                            .any(|y| y.node.borrow().name == name && x == y)
                    })
            }
            _ => false,
        }
    }
}

fn tag_label(tag: Tag) -> &'static str {
    match tag {
        Tag::End => "TAG_End",
        Tag::Byte => "TAG_Byte",
        Tag::Short => "TAG_Short",
        Tag::Int => "TAG_Int",
        Tag::Long => "TAG_Long",
        Tag::Float => "TAG_Float",
        Tag::Double => "TAG_Double",
        Tag::ByteArray => "TAG_Byte_Array",
        Tag::String => "TAG_String",
        Tag::List => "TAG_List",
        Tag::Compound => "TAG_Compound",
        Tag::IntArray => "TAG_Int_Array",
        Tag::LongArray => "TAG_Long_Array",
    }
}

impl NbtTag {
    /// Render the tree, one line per primitive or array tag and indented
    /// blocks for compounds and lists.
    pub fn pretty_print(&self, indent: &str) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, indent, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, indent: &str, depth: usize) {
        for _ in 0..depth {
            out.push_str(indent);
        }
        out.push_str(tag_label(self.kind()));
        if let Some(name) = self.name() {
            out.push_str(&format!("(\"{}\")", name));
        }
        let node = self.node.borrow();
        match &node.payload {
            Payload::Byte(v) => out.push_str(&format!(": {}", v)),
            Payload::Short(v) => out.push_str(&format!(": {}", v)),
            Payload::Int(v) => out.push_str(&format!(": {}", v)),
            Payload::Long(v) => out.push_str(&format!(": {}", v)),
            Payload::Float(v) => out.push_str(&format!(": {}", v)),
            Payload::Double(v) => out.push_str(&format!(": {}", v)),
            Payload::String(v) => out.push_str(&format!(": \"{}\"", v)),
            Payload::ByteArray(v) => out.push_str(&format!(": [{} bytes]", v.len())),
            Payload::IntArray(v) => out.push_str(&format!(": [{} ints]", v.len())),
            Payload::LongArray(v) => out.push_str(&format!(": [{} longs]", v.len())),
            Payload::List { element, items } => {
                let label = element.map(tag_label).unwrap_or("?");
                out.push_str(&format!(": {} entries of {}", items.len(), label));
                if !items.is_empty() {
                    out.push('\n');
                    for _ in 0..depth {
                        out.push_str(indent);
                    }
                    out.push('{');
                    for item in items {
                        out.push('\n');
                        item.pretty_into(out, indent, depth + 1);
                    }
                    out.push('\n');
                    for _ in 0..depth {
                        out.push_str(indent);
                    }
                    out.push('}');
                }
            }
            Payload::Compound(items) => {
                out.push_str(&format!(": {} entries", items.len()));
                if !items.is_empty() {
                    out.push('\n');
                    for _ in 0..depth {
                        out.push_str(indent);
                    }
                    out.push('{');
                    for item in items {
                        out.push('\n');
                        item.pretty_into(out, indent, depth + 1);
                    }
                    out.push('\n');
                    for _ in 0..depth {
                        out.push_str(indent);
                    }
                    out.push('}');
                }
            }
        }
    }
}

impl fmt::Display for NbtTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_print(&config::default_indent()))
    }
}

impl fmt::Debug for NbtTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NbtTag({})", self.pretty_print(""))
    }
}

// ------------- From<T> impls -------------

macro_rules! from {
    ($type:ty, $ctor:ident) => {
        impl From<$type> for NbtTag {
            fn from(val: $type) -> Self {
                NbtTag::$ctor(val)
            }
        }
    };
}
from!(u8, byte);
from!(i16, short);
from!(i32, int);
from!(i64, long);
from!(f32, float);
from!(f64, double);
from!(&str, string);
from!(String, string);
from!(Vec<u8>, byte_array);
from!(Vec<i32>, int_array);
from!(Vec<i64>, long_array);

impl From<bool> for NbtTag {
    fn from(val: bool) -> Self {
        NbtTag::byte(u8::from(val))
    }
}

// ------------- PartialEq against primitives -------------

fn eq_i64(tag: &NbtTag, other: i64) -> bool {
    tag.as_long().map_or(false, |v| v == other)
}

fn eq_f64(tag: &NbtTag, other: f64) -> bool {
    tag.as_double().map_or(false, |v| v == other)
}

macro_rules! partialeq_numeric {
    ($($eq:ident [$($ty:ty)*])*) => {
        $($(
            impl PartialEq<$ty> for NbtTag {
                fn eq(&self, other: &$ty) -> bool {
                    $eq(self, *other as _)
                }
            }

            impl PartialEq<NbtTag> for $ty {
                fn eq(&self, other: &NbtTag) -> bool {
                    $eq(other, *self as _)
                }
            }
        )*)*
    }
}

partialeq_numeric! {
    eq_i64[u8 i16 i32 i64]
    eq_f64[f32 f64]
}

impl PartialEq<str> for NbtTag {
    fn eq(&self, other: &str) -> bool {
        self.string_value().map_or(false, |v| &*v == other)
    }
}

impl<'a> PartialEq<&'a str> for NbtTag {
    fn eq(&self, other: &&str) -> bool {
        self.string_value().map_or(false, |v| &*v == *other)
    }
}
