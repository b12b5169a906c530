//! Symbol table with lexically nested frames.
//!
//! Symbols get dense ids in insertion order across all frames. Frames form a
//! tree through parent *indices* (never pointers), so reactivating an old
//! frame is just an id assignment and cycles are impossible. Frames are
//! append-only: nothing is ever removed, and deactivating a frame does not
//! destroy it.
//!
//! The table is generic over the payload attached to each symbol; the system
//! assembler instantiates it with its own [`Payload`](crate::ast::Payload)
//! enum.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tack_base::{ErrorKind, ParseError, Result};

use crate::types::TypeId;

/// Dense symbol identifier; valid ids are `0..table.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Frame identifier; the root frame is always id 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(u32);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SymbolData<P> {
    name: String,
    ty: TypeId,
    frame: FrameId,
    payload: Option<P>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FrameData {
    parent: Option<FrameId>,
    names: HashMap<String, SymbolId>,
}

/// The table: symbols, frames, and the currently active frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable<P> {
    symbols: Vec<SymbolData<P>>,
    frames: Vec<FrameData>,
    current: FrameId,
}

impl<P> Default for SymbolTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> SymbolTable<P> {
    /// A table with only the (active) root frame.
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            frames: vec![FrameData {
                parent: None,
                names: HashMap::new(),
            }],
            current: FrameId::ROOT,
        }
    }

    /// Number of symbols ever inserted.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Inserts a symbol into the active frame.
    ///
    /// Fails with `DuplicateSymbol` if the frame already binds the name;
    /// shadowing an outer frame is fine.
    pub fn add_symbol(&mut self, name: &str, ty: TypeId, payload: Option<P>) -> Result<SymbolId> {
        if self.resolve_local(name, self.current).is_some() {
            return Err(ParseError::new(
                ErrorKind::DuplicateSymbol,
                format!("symbol '{}' is already declared", name),
            ));
        }
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            name: name.to_string(),
            ty,
            frame: self.current,
            payload,
        });
        self.frames[self.current.index()]
            .names
            .insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolves a name from the active frame outwards; the first hit wins.
    pub fn resolve(&self, name: &str) -> Option<SymbolId> {
        let mut frame = Some(self.current);
        while let Some(f) = frame {
            if let Some(id) = self.resolve_local(name, f) {
                return Some(id);
            }
            frame = self.frames[f.index()].parent;
        }
        None
    }

    /// Resolves a name in exactly one frame.
    pub fn resolve_local(&self, name: &str, frame: FrameId) -> Option<SymbolId> {
        self.frames
            .get(frame.index())
            .and_then(|f| f.names.get(name))
            .copied()
    }

    pub fn name(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(id.index()).map(|s| s.name.as_str())
    }

    pub fn ty(&self, id: SymbolId) -> Option<TypeId> {
        self.symbols.get(id.index()).map(|s| s.ty)
    }

    pub fn set_type(&mut self, id: SymbolId, ty: TypeId) -> Result<()> {
        match self.symbols.get_mut(id.index()) {
            Some(s) => {
                s.ty = ty;
                Ok(())
            }
            None => Err(bad_id(id)),
        }
    }

    pub fn payload(&self, id: SymbolId) -> Option<&P> {
        self.symbols.get(id.index()).and_then(|s| s.payload.as_ref())
    }

    pub fn set_payload(&mut self, id: SymbolId, payload: Option<P>) -> Result<()> {
        match self.symbols.get_mut(id.index()) {
            Some(s) => {
                s.payload = payload;
                Ok(())
            }
            None => Err(bad_id(id)),
        }
    }

    /// Creates a child frame of the active frame without activating it.
    pub fn add_frame(&mut self) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(FrameData {
            parent: Some(self.current),
            names: HashMap::new(),
        });
        id
    }

    pub fn activate_frame(&mut self, frame: FrameId) -> Result<()> {
        if frame.index() >= self.frames.len() {
            return Err(ParseError::new(
                ErrorKind::BadId,
                format!("no such frame: {}", frame.0),
            ));
        }
        self.current = frame;
        Ok(())
    }

    pub fn active_frame(&self) -> FrameId {
        self.current
    }

    /// The parent of the given frame; the root frame has none.
    pub fn parent_frame(&self, frame: FrameId) -> Option<FrameId> {
        self.frames.get(frame.index()).and_then(|f| f.parent)
    }

    /// The frame a symbol was inserted into.
    pub fn frame_of(&self, id: SymbolId) -> Option<FrameId> {
        self.symbols.get(id.index()).map(|s| s.frame)
    }
}

fn bad_id(id: SymbolId) -> ParseError {
    ParseError::new(ErrorKind::BadId, format!("no such symbol: {}", id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn table() -> SymbolTable<u32> {
        SymbolTable::new()
    }

    #[test]
    fn ids_are_dense_across_frames() {
        let mut st = table();
        let a = st.add_symbol("a", TypeId::INT, None).unwrap();
        let frame = st.add_frame();
        st.activate_frame(frame).unwrap();
        let b = st.add_symbol("b", TypeId::CLOCK, None).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(st.len(), 2);
    }

    #[test]
    fn added_symbols_land_in_the_active_frame() {
        let mut st = table();
        let frame = st.add_frame();
        st.activate_frame(frame).unwrap();
        let id = st.add_symbol("x", TypeId::INT, Some(7)).unwrap();
        assert_eq!(st.frame_of(id), Some(frame));
        assert_eq!(st.resolve_local("x", frame), Some(id));
        assert_eq!(st.resolve_local("x", FrameId::ROOT), None);
    }

    #[test]
    fn duplicate_in_one_frame_is_rejected() {
        let mut st = table();
        st.add_symbol("x", TypeId::INT, None).unwrap();
        let err = st.add_symbol("x", TypeId::CLOCK, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateSymbol);
    }

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut st = table();
        let outer = st.add_symbol("x", TypeId::INT, Some(1)).unwrap();
        let frame = st.add_frame();
        st.activate_frame(frame).unwrap();
        let inner = st.add_symbol("x", TypeId::CLOCK, Some(2)).unwrap();

        assert_eq!(st.resolve("x"), Some(inner));
        st.activate_frame(FrameId::ROOT).unwrap();
        assert_eq!(st.resolve("x"), Some(outer));
    }

    #[test]
    fn resolve_walks_to_the_root() {
        let mut st = table();
        let a = st.add_symbol("a", TypeId::INT, None).unwrap();
        let f1 = st.add_frame();
        st.activate_frame(f1).unwrap();
        let f2 = st.add_frame();
        st.activate_frame(f2).unwrap();
        assert_eq!(st.resolve("a"), Some(a));
        assert_eq!(st.resolve("missing"), None);
        assert_eq!(st.parent_frame(f2), Some(f1));
        assert_eq!(st.parent_frame(f1), Some(FrameId::ROOT));
        assert_eq!(st.parent_frame(FrameId::ROOT), None);
    }

    #[test]
    fn deactivated_frames_keep_their_symbols() {
        let mut st = table();
        let frame = st.add_frame();
        st.activate_frame(frame).unwrap();
        let id = st.add_symbol("local", TypeId::INT, None).unwrap();
        st.activate_frame(FrameId::ROOT).unwrap();

        assert_eq!(st.resolve("local"), None);
        assert_eq!(st.name(id), Some("local"));
        st.activate_frame(frame).unwrap();
        assert_eq!(st.resolve("local"), Some(id));
    }

    #[test]
    fn accessors_and_setters() {
        let mut reg = TypeRegistry::new();
        let tbi = reg.add_integer(0, 5);
        let mut st = table();
        let id = st.add_symbol("v", TypeId::INT, None).unwrap();

        assert_eq!(st.ty(id), Some(TypeId::INT));
        st.set_type(id, tbi).unwrap();
        assert_eq!(st.ty(id), Some(tbi));

        assert!(st.payload(id).is_none());
        st.set_payload(id, Some(9)).unwrap();
        assert_eq!(st.payload(id), Some(&9));
    }

    #[test]
    fn setters_fail_on_bogus_ids() {
        let mut st = table();
        let bogus = SymbolId(42);
        assert_eq!(
            st.set_type(bogus, TypeId::INT).unwrap_err().kind,
            ErrorKind::BadId
        );
        assert_eq!(
            st.set_payload(bogus, Some(1)).unwrap_err().kind,
            ErrorKind::BadId
        );
        assert!(st.name(bogus).is_none());
        assert!(st.ty(bogus).is_none());
    }

    #[test]
    fn resolve_local_of_own_name_is_identity() {
        let mut st = table();
        let frame = st.add_frame();
        st.activate_frame(frame).unwrap();
        let id = st.add_symbol("n", TypeId::CHANNEL, None).unwrap();
        let name = st.name(id).unwrap().to_string();
        let frame_of = st.frame_of(id).unwrap();
        assert_eq!(st.resolve_local(&name, frame_of), Some(id));
    }
}
