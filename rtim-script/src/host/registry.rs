use super::HostContext;

pub type HostOpcode<H> = Box<dyn Fn(&mut H, &mut HostContext<'_>, &[u16]) -> i32>;

/// Game-specific opcodes reachable through `exec_opcode`.
///
/// The host decides how many entries exist; holes and indices past the end
/// are treated as unimplemented by the interpreter.
pub struct HostOpcodeTable<H> {
    entries: Vec<Option<HostOpcode<H>>>,
}

impl<H> Default for HostOpcodeTable<H> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<H> HostOpcodeTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, index: u16, f: F)
    where
        F: Fn(&mut H, &mut HostContext<'_>, &[u16]) -> i32 + 'static,
    {
        let index = index as usize;
        if self.entries.len() <= index {
            self.entries.resize_with(index + 1, || None);
        }
        self.entries[index] = Some(Box::new(f));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, index: u16) -> bool {
        matches!(self.entries.get(index as usize), Some(Some(_)))
    }

    /// `None` when `index` has no handler.
    pub fn call(&self, host: &mut H, ctx: &mut HostContext<'_>, index: u16, params: &[u16]) -> Option<i32> {
        let f = self.entries.get(index as usize)?.as_ref()?;
        Some(f(host, ctx, params))
    }
}
