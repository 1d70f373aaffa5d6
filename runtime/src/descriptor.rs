//! Extension descriptors: the immutable records extensions publish to the
//! registry, one per lifecycle category.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;

/// The seven lifecycle categories, in bring-up order. Teardown and rollback
/// walk them in exact reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    EarlyInit,
    SymbolAlias,
    NormalInit,
    EarlyUpdater,
    FunctionOverride,
    NormalUpdater,
    FinalInit,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::EarlyInit,
        Category::SymbolAlias,
        Category::NormalInit,
        Category::EarlyUpdater,
        Category::FunctionOverride,
        Category::NormalUpdater,
        Category::FinalInit,
    ];

    /// The category's distinguishing prefix, a closed set of seven strings.
    pub fn prefix(self) -> &'static str {
        match self {
            Category::EarlyInit => "EARLY_INIT",
            Category::SymbolAlias => "SYMBOL_ALIAS",
            Category::NormalInit => "NORMAL_INIT",
            Category::EarlyUpdater => "EARLY_UPDATER",
            Category::FunctionOverride => "FUNCTION_OVERRIDE",
            Category::NormalUpdater => "NORMAL_UPDATER",
            Category::FinalInit => "FINAL_INIT",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A process-wide, write-once storage cell for a resolved symbol address.
///
/// Written exactly once by the resolver during the SYMBOL_ALIAS stage, read
/// thereafter by the declaring extension. The release store happens strictly
/// before any later-stage callback runs, so readers need no locking.
pub struct AliasSlot(AtomicUsize);

impl AliasSlot {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// The resolved address, once the alias stage has run.
    pub fn get(&self) -> Option<usize> {
        match self.0.load(Ordering::Acquire) {
            0 => None,
            addr => Some(addr),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }

    pub(crate) fn store(&self, addr: usize) {
        self.0.store(addr, Ordering::Release);
    }
}

impl Default for AliasSlot {
    fn default() -> Self {
        Self::new()
    }
}

type InitFn = Box<dyn FnMut() -> Result<()> + Send>;
type ExitFn = Box<dyn FnMut() + Send>;

/// Init/exit callback pair shared by the three init categories.
pub struct InitDescriptor {
    pub name: String,
    init: InitFn,
    exit: ExitFn,
}

impl InitDescriptor {
    pub(crate) fn init(&mut self) -> Result<()> {
        (self.init)()
    }

    pub(crate) fn exit(&mut self) {
        (self.exit)()
    }
}

/// A symbol name plus the slot the resolver populates with its address.
pub struct AliasDescriptor {
    pub symbol: String,
    pub(crate) slot: &'static AliasSlot,
}

/// Paired update/restore callbacks over one owned context.
///
/// The context handed to `restore` is exactly the one the paired `update`
/// mutated; the pairing is enforced by ownership rather than by threading
/// raw private-data pointers through the core.
trait UpdaterHooks: Send {
    fn update(&mut self) -> Result<()>;
    fn restore(&mut self);
}

struct PairedUpdater<C, U, R> {
    ctx: C,
    update: U,
    restore: R,
}

impl<C, U, R> UpdaterHooks for PairedUpdater<C, U, R>
where
    C: Send,
    U: FnMut(&mut C) -> Result<()> + Send,
    R: FnMut(&mut C) + Send,
{
    fn update(&mut self) -> Result<()> {
        let PairedUpdater { ctx, update, .. } = self;
        update(ctx)
    }

    fn restore(&mut self) {
        let PairedUpdater { ctx, restore, .. } = self;
        restore(ctx)
    }
}

pub struct UpdaterDescriptor {
    pub name: String,
    hooks: Box<dyn UpdaterHooks>,
}

impl UpdaterDescriptor {
    pub(crate) fn update(&mut self) -> Result<()> {
        self.hooks.update()
    }

    pub(crate) fn restore(&mut self) {
        self.hooks.restore()
    }
}

/// Target identification plus replacement address for one override.
pub struct OverrideDescriptor {
    pub name: String,
    /// Pinned target address; useful when the symbol table holds duplicates.
    /// `None` means resolve `name` at install time.
    pub explicit_addr: Option<usize>,
    pub replacement: usize,
}

/// An immutable record declaring one extension's participation in one
/// lifecycle category. The variant is the category; membership is fixed at
/// construction and never changes.
pub enum Descriptor {
    EarlyInit(InitDescriptor),
    SymbolAlias(AliasDescriptor),
    NormalInit(InitDescriptor),
    EarlyUpdater(UpdaterDescriptor),
    FunctionOverride(OverrideDescriptor),
    NormalUpdater(UpdaterDescriptor),
    FinalInit(InitDescriptor),
}

impl Descriptor {
    pub fn early_init(
        name: impl Into<String>,
        init: impl FnMut() -> Result<()> + Send + 'static,
        exit: impl FnMut() + Send + 'static,
    ) -> Self {
        Descriptor::EarlyInit(Self::init_descriptor(name, init, exit))
    }

    pub fn normal_init(
        name: impl Into<String>,
        init: impl FnMut() -> Result<()> + Send + 'static,
        exit: impl FnMut() + Send + 'static,
    ) -> Self {
        Descriptor::NormalInit(Self::init_descriptor(name, init, exit))
    }

    pub fn final_init(
        name: impl Into<String>,
        init: impl FnMut() -> Result<()> + Send + 'static,
        exit: impl FnMut() + Send + 'static,
    ) -> Self {
        Descriptor::FinalInit(Self::init_descriptor(name, init, exit))
    }

    pub fn symbol_alias(symbol: impl Into<String>, slot: &'static AliasSlot) -> Self {
        Descriptor::SymbolAlias(AliasDescriptor {
            symbol: symbol.into(),
            slot,
        })
    }

    pub fn early_updater<C, U, R>(name: impl Into<String>, ctx: C, update: U, restore: R) -> Self
    where
        C: Send + 'static,
        U: FnMut(&mut C) -> Result<()> + Send + 'static,
        R: FnMut(&mut C) + Send + 'static,
    {
        Descriptor::EarlyUpdater(Self::updater_descriptor(name, ctx, update, restore))
    }

    pub fn normal_updater<C, U, R>(name: impl Into<String>, ctx: C, update: U, restore: R) -> Self
    where
        C: Send + 'static,
        U: FnMut(&mut C) -> Result<()> + Send + 'static,
        R: FnMut(&mut C) + Send + 'static,
    {
        Descriptor::NormalUpdater(Self::updater_descriptor(name, ctx, update, restore))
    }

    pub fn function_override(
        name: impl Into<String>,
        explicit_addr: Option<usize>,
        replacement: usize,
    ) -> Self {
        Descriptor::FunctionOverride(OverrideDescriptor {
            name: name.into(),
            explicit_addr,
            replacement,
        })
    }

    pub fn category(&self) -> Category {
        match self {
            Descriptor::EarlyInit(_) => Category::EarlyInit,
            Descriptor::SymbolAlias(_) => Category::SymbolAlias,
            Descriptor::NormalInit(_) => Category::NormalInit,
            Descriptor::EarlyUpdater(_) => Category::EarlyUpdater,
            Descriptor::FunctionOverride(_) => Category::FunctionOverride,
            Descriptor::NormalUpdater(_) => Category::NormalUpdater,
            Descriptor::FinalInit(_) => Category::FinalInit,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Descriptor::EarlyInit(d) | Descriptor::NormalInit(d) | Descriptor::FinalInit(d) => {
                &d.name
            }
            Descriptor::SymbolAlias(d) => &d.symbol,
            Descriptor::EarlyUpdater(d) | Descriptor::NormalUpdater(d) => &d.name,
            Descriptor::FunctionOverride(d) => &d.name,
        }
    }

    fn init_descriptor(
        name: impl Into<String>,
        init: impl FnMut() -> Result<()> + Send + 'static,
        exit: impl FnMut() + Send + 'static,
    ) -> InitDescriptor {
        InitDescriptor {
            name: name.into(),
            init: Box::new(init),
            exit: Box::new(exit),
        }
    }

    fn updater_descriptor<C, U, R>(
        name: impl Into<String>,
        ctx: C,
        update: U,
        restore: R,
    ) -> UpdaterDescriptor
    where
        C: Send + 'static,
        U: FnMut(&mut C) -> Result<()> + Send + 'static,
        R: FnMut(&mut C) + Send + 'static,
    {
        UpdaterDescriptor {
            name: name.into(),
            hooks: Box::new(PairedUpdater {
                ctx,
                update,
                restore,
            }),
        }
    }
}
