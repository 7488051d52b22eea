//! Destination-picker policy rows.

use super::entities::{user_rule, UserRule, UserRuleActive};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder};

impl Catalog {
	pub async fn add_rule(
		&self,
		rule_type: user_rule::RuleType,
		drive_id: i32,
		priority: i32,
	) -> CoreResult<user_rule::Model> {
		self.get_drive(drive_id).await?;
		let active = UserRuleActive {
			rule_type: Set(rule_type.to_string()),
			drive_id: Set(drive_id),
			priority: Set(priority),
			..Default::default()
		};
		Ok(active.insert(self.conn()).await?)
	}

	/// Rules in priority order, highest first — the order the picker applies them.
	pub async fn list_rules(&self, drive_id: Option<i32>) -> CoreResult<Vec<user_rule::Model>> {
		let mut query = UserRule::find();
		if let Some(drive_id) = drive_id {
			query = query.filter(user_rule::Column::DriveId.eq(drive_id));
		}
		Ok(query
			.order_by_desc(user_rule::Column::Priority)
			.all(self.conn())
			.await?)
	}

	pub async fn get_rule(&self, id: i32) -> CoreResult<user_rule::Model> {
		UserRule::find_by_id(id)
			.one(self.conn())
			.await?
			.ok_or_else(|| CoreError::not_found(format!("rule {id}")))
	}

	pub async fn delete_rule(&self, id: i32) -> CoreResult<()> {
		let rule = self.get_rule(id).await?;
		rule.delete(self.conn()).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::Catalog;

	#[tokio::test]
	async fn rules_list_highest_priority_first() {
		let catalog = Catalog::open_in_memory().await.unwrap();
		let drive = catalog.register_drive("/mnt/a", None, None).await.unwrap();
		catalog.add_rule(user_rule::RuleType::Denylist, drive.id, 1).await.unwrap();
		catalog.add_rule(user_rule::RuleType::PreferAll, drive.id, 5).await.unwrap();

		let rules = catalog.list_rules(Some(drive.id)).await.unwrap();
		assert_eq!(rules[0].priority, 5);
		assert_eq!(rules[1].priority, 1);
	}
}
