use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Full,
    Student,
    Discount,
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanType::Full => write!(f, "full"),
            PlanType::Student => write!(f, "student"),
            PlanType::Discount => write!(f, "discount"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub id: Uuid,
    pub plan_type: PlanType,
    pub discount_percent: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanRequest {
    pub plan_type: PlanType,

    #[serde(default)]
    #[validate(range(max = 100, message = "Discount must be between 0 and 100 percent"))]
    pub discount_percent: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    pub plan_type: Option<PlanType>,

    #[validate(range(max = 100, message = "Discount must be between 0 and 100 percent"))]
    pub discount_percent: Option<u32>,
}

/// A committed edit of a plan row, as seen before and after the write.
#[derive(Debug, Clone)]
pub struct PlanChange {
    pub before: Plan,
    pub after: Plan,
}

impl PlanChange {
    pub fn discount_changed(&self) -> bool {
        self.before.discount_percent != self.after.discount_percent
    }
}

impl Plan {
    pub fn new(request: CreatePlanRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            plan_type: request.plan_type,
            discount_percent: request.discount_percent,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, request: UpdatePlanRequest) {
        if let Some(plan_type) = request.plan_type {
            self.plan_type = plan_type;
        }
        if let Some(discount_percent) = request.discount_percent {
            self.discount_percent = discount_percent;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_above_hundred_rejected() {
        let request = CreatePlanRequest {
            plan_type: PlanType::Discount,
            discount_percent: 101,
        };
        assert!(request.validate().is_err());

        let update = UpdatePlanRequest {
            plan_type: None,
            discount_percent: Some(150),
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_discount_defaults_to_zero() {
        let request: CreatePlanRequest =
            serde_json::from_str(r#"{"plan_type":"student"}"#).unwrap();
        assert_eq!(request.plan_type, PlanType::Student);
        assert_eq!(request.discount_percent, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_plan_type_change_is_not_a_discount_change() {
        let before = Plan::new(CreatePlanRequest {
            plan_type: PlanType::Full,
            discount_percent: 0,
        });
        let mut after = before.clone();
        after.apply(UpdatePlanRequest {
            plan_type: Some(PlanType::Student),
            discount_percent: None,
        });

        assert!(!PlanChange { before, after }.discount_changed());
    }
}
