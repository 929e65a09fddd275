/// The node kinds the transcription distinguishes.
///
/// Everything the transform does not treat specially collapses into `Other`,
/// text and comments into `NonElement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Measure,
    Staff,
    Layer,
    Beam,
    TabGrp,
    TabDurSym,
    Note,
    Rest,
    Fermata,
    Annot,
    Fing,
    Dir,
    /// Editorial markup replaced by its contents before isolation
    Wrapper,
    /// Editorial alternatives, resolved to one reading
    Choice,
    Other,
    NonElement,
}

const WRAPPERS: [&str; 11] = [
    "add", "corr", "damage", "del", "expan", "orig", "reg", "restore", "sic", "supplied", "unclear",
];

impl NodeKind {
    pub fn from_local_name(name: &str) -> Self {
        match name {
            "measure" => Self::Measure,
            "staff" => Self::Staff,
            "layer" => Self::Layer,
            "beam" => Self::Beam,
            "tabGrp" => Self::TabGrp,
            "tabDurSym" => Self::TabDurSym,
            "note" => Self::Note,
            "rest" => Self::Rest,
            "fermata" => Self::Fermata,
            "annot" => Self::Annot,
            "fing" => Self::Fing,
            "dir" => Self::Dir,
            "choice" => Self::Choice,
            name if WRAPPERS.contains(&name) => Self::Wrapper,
            _ => Self::Other,
        }
    }

    /// Kinds that make up the staff hierarchy of a tablature measure.
    pub const fn is_regular(self) -> bool {
        matches!(
            self,
            Self::Measure
                | Self::Staff
                | Self::Layer
                | Self::Beam
                | Self::TabGrp
                | Self::TabDurSym
                | Self::Note
                | Self::Rest
        )
    }

    /// Kinds that only exist inside a tablature layer and get replaced by CMN counterparts.
    pub const fn is_tablature_internal(self) -> bool {
        matches!(self, Self::TabGrp | Self::TabDurSym | Self::Note | Self::Rest)
    }
}
