//! The aggregated build information of a running binary.

use crate::codec::{self, Fields};
use crate::standard::StandardInfo;

/// Standard metadata plus the decoded extended fields.
///
/// Built once at startup and read-only afterwards; hand it to renderers by
/// reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    standard: StandardInfo,
    fields: Fields,
}

impl BuildInfo {
    /// Decode `envelope` and pair it with `standard`.
    ///
    /// ```
    /// let info = xbi::BuildInfo::new(xbi::StandardInfo::default(), "X_BI_KEY_BUILD_HOST:ci");
    /// assert_eq!(info.fields().get(xbi::FieldKey::BuildHost), Some("ci"));
    /// ```
    #[must_use]
    pub fn new(standard: StandardInfo, envelope: &str) -> Self {
        Self::builder(standard).item(envelope).build()
    }

    #[must_use]
    pub fn builder(standard: StandardInfo) -> BuildInfoBuilder {
        BuildInfoBuilder {
            standard,
            fields: Fields::new(),
        }
    }

    #[must_use]
    pub const fn standard(&self) -> &StandardInfo {
        &self.standard
    }

    #[must_use]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }
}

/// Accumulates extended items before freezing them into a [`BuildInfo`].
#[derive(Debug)]
pub struct BuildInfoBuilder {
    standard: StandardInfo,
    fields: Fields,
}

impl BuildInfoBuilder {
    /// Decode one envelope or `key:value` item; later items win.
    ///
    /// Only the known [`FieldKey`](crate::FieldKey) names are kept. Items
    /// with any other key, including unrecognized `X_BI_KEY_*` names, are
    /// dropped with a warning.
    #[must_use]
    pub fn item(mut self, item: &str) -> Self {
        codec::decode_into(&mut self.fields, item);
        self
    }

    #[must_use]
    pub fn items<'i>(self, items: impl IntoIterator<Item = &'i str>) -> Self {
        items.into_iter().fold(self, Self::item)
    }

    #[must_use]
    pub fn build(self) -> BuildInfo {
        BuildInfo {
            standard: self.standard,
            fields: self.fields,
        }
    }
}

/// Build the [`BuildInfo`] of the calling crate from zero or more items.
///
/// ```ignore
/// mod generated {
///     xbi::include_build_info!();
/// }
/// let info = xbi::build_info!(generated::XBI);
/// ```
#[macro_export]
macro_rules! build_info {
    ($($item:expr),* $(,)?) => {
        $crate::BuildInfo::builder($crate::standard_info!())
            $(.item($item))*
            .build()
    };
}
