//! Role entitlement resource: grants one named entitlement to one role.

use super::entity::{
    require_text, Entity, EntityId, FieldDecodeError, FieldDef, FieldKind, FieldReader,
    FieldValue, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ROLE_ENTITLEMENT_FIELDS: &[FieldDef] = &[
    FieldDef::new("roleName", "role_name", FieldKind::Text, false),
    FieldDef::new("entitlement", "entitlement", FieldKind::Text, false),
    FieldDef::new("description", "description", FieldKind::Text, true),
    FieldDef::new("isEnabled", "is_enabled", FieldKind::Bool, false),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntitlement {
    #[serde(default)]
    pub id: EntityId,
    pub role_name: String,
    pub entitlement: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl RoleEntitlement {
    /// Creates an enabled grant with a generated id.
    pub fn new(role_name: impl Into<String>, entitlement: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_name: role_name.into(),
            entitlement: entitlement.into(),
            description: None,
            is_enabled: true,
        }
    }
}

impl Entity for RoleEntitlement {
    const RESOURCE: &'static str = "RoleEntitlement";
    const TABLE: &'static str = "role_entitlements";

    fn fields() -> &'static [FieldDef] {
        ROLE_ENTITLEMENT_FIELDS
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.role_name.clone()),
            FieldValue::Text(self.entitlement.clone()),
            self.description.clone().into(),
            FieldValue::Bool(self.is_enabled),
        ]
    }

    fn from_values(id: EntityId, values: Vec<FieldValue>) -> Result<Self, FieldDecodeError> {
        let mut reader = FieldReader::new(Self::RESOURCE, ROLE_ENTITLEMENT_FIELDS, values);
        Ok(Self {
            id,
            role_name: reader.text()?,
            entitlement: reader.text()?,
            description: reader.opt_text()?,
            is_enabled: reader.bool()?,
        })
    }

    fn copy_from(&mut self, other: &Self) {
        self.role_name = other.role_name.clone();
        self.entitlement = other.entitlement.clone();
        self.description = other.description.clone();
        self.is_enabled = other.is_enabled;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::RESOURCE, "roleName", &self.role_name)?;
        require_text(Self::RESOURCE, "entitlement", &self.entitlement)
    }
}
