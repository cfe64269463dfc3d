use std::fmt;

/// Steel-surface defect classes, in model class-id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectClass {
    Crack,
    Inclusion,
    Porosity,
    Scratch,
    Oxidation,
    Decarburization,
}

impl DefectClass {
    /// Every class, indexed by its class id.
    pub const ALL: [DefectClass; 6] = [
        DefectClass::Crack,
        DefectClass::Inclusion,
        DefectClass::Porosity,
        DefectClass::Scratch,
        DefectClass::Oxidation,
        DefectClass::Decarburization,
    ];

    pub fn from_id(class_id: u32) -> Option<Self> {
        Self::ALL.get(class_id as usize).copied()
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            DefectClass::Crack => "Crack",
            DefectClass::Inclusion => "Inclusion",
            DefectClass::Porosity => "Porosity",
            DefectClass::Scratch => "Scratch",
            DefectClass::Oxidation => "Oxidation",
            DefectClass::Decarburization => "Decarburization",
        }
    }
}

/// Display label for a class id; ids outside the vocabulary keep their number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassLabel {
    Known(DefectClass),
    Unknown(u32),
}

impl ClassLabel {
    pub fn resolve(class_id: u32) -> Self {
        match DefectClass::from_id(class_id) {
            Some(class) => ClassLabel::Known(class),
            None => ClassLabel::Unknown(class_id),
        }
    }

    pub fn class_id(self) -> u32 {
        match self {
            ClassLabel::Known(class) => class.id(),
            ClassLabel::Unknown(id) => id,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Known(class) => f.write_str(class.name()),
            ClassLabel::Unknown(id) => write!(f, "Class {id}"),
        }
    }
}
