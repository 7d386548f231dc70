//! Value and spatial definitions attached to exchange items.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The base quantities a [`Dimension`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DimensionBase {
    Length,
    Mass,
    Time,
    ElectricCurrent,
    Temperature,
    AmountOfSubstance,
    LuminousIntensity,
    Currency,
}

impl DimensionBase {
    const ALL: [DimensionBase; 8] = [
        DimensionBase::Length,
        DimensionBase::Mass,
        DimensionBase::Time,
        DimensionBase::ElectricCurrent,
        DimensionBase::Temperature,
        DimensionBase::AmountOfSubstance,
        DimensionBase::LuminousIntensity,
        DimensionBase::Currency,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Powers of each base quantity, e.g. `m^3/s` is length 3 and time -1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimension {
    powers: [f64; 8],
}

impl Dimension {
    /// Returns a dimensionless dimension.
    #[must_use]
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// Returns this dimension with `base` raised to `power`.
    #[must_use]
    pub fn with(mut self, base: DimensionBase, power: f64) -> Self {
        self.powers[base.index()] = power;
        self
    }

    #[must_use]
    pub fn power(&self, base: DimensionBase) -> f64 {
        self.powers[base.index()]
    }

    /// Returns `true` if every base power matches.
    #[must_use]
    pub fn matches(&self, other: &Dimension) -> bool {
        DimensionBase::ALL
            .iter()
            .all(|&base| (self.power(base) - other.power(base)).abs() < f64::EPSILON)
    }
}

/// A unit of measure and its affine conversion to SI.
///
/// A value `x` in this unit is `x * conversion_factor_to_si + offset_to_si`
/// in SI.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Unit {
    pub caption: String,
    pub dimension: Dimension,
    pub conversion_factor_to_si: f64,
    pub offset_to_si: f64,
}

impl Unit {
    /// Creates an SI unit with the given dimension.
    #[must_use]
    pub fn si(caption: impl Into<String>, dimension: Dimension) -> Self {
        Self::scaled(caption, dimension, 1.0, 0.0)
    }

    #[must_use]
    pub fn scaled(
        caption: impl Into<String>,
        dimension: Dimension,
        conversion_factor_to_si: f64,
        offset_to_si: f64,
    ) -> Self {
        Self {
            caption: caption.into(),
            dimension,
            conversion_factor_to_si,
            offset_to_si,
        }
    }

    /// Returns `(a, b)` such that a value `x` in this unit is `a * x + b` in
    /// `target`, or `None` if the dimensions differ.
    #[must_use]
    pub fn conversion_to(&self, target: &Unit) -> Option<(f64, f64)> {
        if !self.dimension.matches(&target.dimension) || target.conversion_factor_to_si == 0.0 {
            return None;
        }
        let a = self.conversion_factor_to_si / target.conversion_factor_to_si;
        let b = (self.offset_to_si - target.offset_to_si) / target.conversion_factor_to_si;
        Some((a, b))
    }
}

/// A measured quantity with a unit.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quantity {
    pub caption: String,
    pub unit: Unit,
    pub missing_value: f64,
}

/// One category of a [`Quality`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Category {
    pub caption: String,
    pub value: f64,
}

/// A categorical value with a fixed set of categories.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quality {
    pub caption: String,
    pub categories: Vec<Category>,
    pub ordered: bool,
}

/// What the values of an exchange item mean.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueDefinition {
    Quantity(Quantity),
    Quality(Quality),
}

impl ValueDefinition {
    /// Creates a quantity definition with `-999.0` as missing value.
    #[must_use]
    pub fn quantity(caption: impl Into<String>, unit: Unit) -> Self {
        ValueDefinition::Quantity(Quantity {
            caption: caption.into(),
            unit,
            missing_value: -999.0,
        })
    }

    #[must_use]
    pub fn caption(&self) -> &str {
        match self {
            ValueDefinition::Quantity(quantity) => &quantity.caption,
            ValueDefinition::Quality(quality) => &quality.caption,
        }
    }

    /// Returns the quantity, if this is one.
    #[must_use]
    pub fn as_quantity(&self) -> Option<&Quantity> {
        match self {
            ValueDefinition::Quantity(quantity) => Some(quantity),
            ValueDefinition::Quality(_) => None,
        }
    }
}

/// Geometry of the elements in an [`ElementSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementType {
    IdBased,
    Point,
    Polyline,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Element {
    pub id: String,
    pub vertices: Vec<Coordinate>,
}

impl Element {
    #[must_use]
    pub fn id_based(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vertices: Vec::new(),
        }
    }
}

/// The spatial definition of an exchange item.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementSet {
    pub caption: String,
    pub element_type: ElementType,
    pub elements: Vec<Element>,
}

impl ElementSet {
    /// Creates an id-based element set.
    #[must_use]
    pub fn id_based<I, S>(caption: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            caption: caption.into(),
            element_type: ElementType::IdBased,
            elements: ids.into_iter().map(Element::id_based).collect(),
        }
    }

    /// Creates a set with one id-based element, used for scalar items.
    #[must_use]
    pub fn scalar(caption: impl Into<String>) -> Self {
        let caption = caption.into();
        Self::id_based(caption.clone(), [caption])
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Returns the position of the element with `id`.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.elements.iter().position(|element| element.id == id)
    }
}
