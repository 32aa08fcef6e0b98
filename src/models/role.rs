use crate::{database::get_db, error::AppResult};
use futures::StreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

pub const WORKER_ROLE: &str = "Worker";

#[derive(Debug, Deserialize, Serialize)]
pub struct Role {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub role_name: String,
}

/// Join entity between users and roles.
#[derive(Debug, Deserialize, Serialize)]
pub struct RoleAssignment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub role_id: ObjectId,
    #[serde(default = "RoleAssignment::default_is_active")]
    pub is_active: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct AssignedRole {
    pub role_name: String,
    pub is_active: bool,
}

impl Role {
    pub async fn find_by_name(role_name: &str) -> AppResult<Option<Role>> {
        let db: Database = get_db()?;
        let collection: Collection<Role> = db.collection::<Role>("roles");

        Ok(collection
            .find_one(doc! { "role_name": role_name }, None)
            .await?)
    }
}

impl RoleAssignment {
    fn default_is_active() -> bool {
        true
    }

    pub fn roles_of_user_pipeline(user_id: &ObjectId) -> Vec<Document> {
        vec![
            doc! { "$match": { "user_id": user_id } },
            doc! {
                "$lookup": {
                    "from": "roles",
                    "localField": "role_id",
                    "foreignField": "_id",
                    "as": "role"
                }
            },
            doc! { "$unwind": "$role" },
            doc! {
                "$project": {
                    "_id": 0,
                    "role_name": "$role.role_name",
                    "is_active": { "$ifNull": ["$is_active", true] }
                }
            },
        ]
    }

    pub async fn find_roles_of_user(user_id: &ObjectId) -> AppResult<Vec<AssignedRole>> {
        let db: Database = get_db()?;
        let collection: Collection<RoleAssignment> =
            db.collection::<RoleAssignment>("user-roles");

        let mut roles: Vec<AssignedRole> = Vec::new();
        let mut cursor = collection
            .aggregate(Self::roles_of_user_pipeline(user_id), None)
            .await?;
        while let Some(doc) = cursor.next().await {
            roles.push(from_document::<AssignedRole>(doc?)?);
        }
        Ok(roles)
    }
}
