//! Request and response DTO behaviour as seen by API clients

use chrono::{TimeZone, Utc};
use dialer_api::dto::{
    AllocateResponse, CampaignStatusUpdateRequest, EnqueueRequest, QueueEntryResponse,
    QueueListParams, StatusUpdateRequest,
};
use dialer_core::models::CampaignStatus;
use dialer_core::models::{CallType, QueueEntry, QueueStatus};
use dialer_core::AppError;
use uuid::Uuid;
use validator::Validate;

#[test]
fn test_campaign_enqueue_from_json() {
    let user_id = Uuid::new_v4();
    let campaign_id = Uuid::new_v4();
    let req: EnqueueRequest = serde_json::from_value(serde_json::json!({
        "user_id": user_id,
        "call_type": "campaign",
        "campaign_id": campaign_id,
        "scheduled_for": "2024-06-10T09:00:00Z",
        "priority": 10,
        "position": 2,
    }))
    .unwrap();

    assert!(req.validate().is_ok());
    let entry = req.to_new_entry().unwrap();
    assert_eq!(entry.call_type, CallType::Campaign);
    assert_eq!(entry.campaign_id, Some(campaign_id));
    assert_eq!(
        entry.scheduled_for,
        Some(Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap())
    );
    assert_eq!(entry.position, Some(2));
}

#[test]
fn test_negative_position_rejected() {
    let req: EnqueueRequest = serde_json::from_value(serde_json::json!({
        "user_id": Uuid::new_v4(),
        "position": -1,
    }))
    .unwrap();
    assert!(req.validate().is_err());
}

#[test]
fn test_status_update_targets() {
    let req = StatusUpdateRequest {
        status: "completed".to_string(),
    };
    assert_eq!(req.target().unwrap(), QueueStatus::Completed);

    let req = StatusUpdateRequest {
        status: "dialing".to_string(),
    };
    assert!(matches!(req.target(), Err(AppError::Validation(_))));

    let empty = StatusUpdateRequest {
        status: String::new(),
    };
    assert!(empty.validate().is_err());
}

#[test]
fn test_allocated_entry_serialization() {
    let mut entry = QueueEntry::campaign(Uuid::new_v4(), Uuid::new_v4(), 10, 2);
    entry.status = QueueStatus::Allocated;
    entry.last_system_allocation_at = Some(Utc::now());

    let json = serde_json::to_value(AllocateResponse::from(Some(entry.clone()))).unwrap();
    assert_eq!(json["allocated"], true);
    assert_eq!(json["entry"]["status"], "allocated");
    assert_eq!(json["entry"]["call_type"], "campaign");
    assert_eq!(json["entry"]["priority"], 10);

    let response = QueueEntryResponse::from(entry);
    assert!(response.last_system_allocation_at.is_some());
}

#[test]
fn test_queue_listing_defaults() {
    let user_id = Uuid::new_v4();
    let params: QueueListParams =
        serde_json::from_value(serde_json::json!({ "user_id": user_id })).unwrap();
    assert_eq!(params.page, 1);
    assert_eq!(params.per_page, 100);
    assert_eq!(params.offset(), 0);
    assert_eq!(params.status().unwrap(), None);
    assert!(params.validate().is_ok());
}

#[test]
fn test_campaign_pause_request() {
    let req: CampaignStatusUpdateRequest =
        serde_json::from_value(serde_json::json!({ "status": "paused" })).unwrap();
    assert!(req.validate().is_ok());
    assert_eq!(req.target().unwrap(), CampaignStatus::Paused);
    assert!(!req.target().unwrap().is_dispatchable());
}
