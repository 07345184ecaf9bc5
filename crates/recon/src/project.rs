use crate::model::{LeadLog, LeadProfile, MembershipLog, ReferrerProfile};

/// Narrow a resolved membership row to the referrer fields the report uses.
/// Only called on resolver output, where `user_id` is always present.
pub fn referrer_profile(log: MembershipLog) -> ReferrerProfile {
    ReferrerProfile {
        user_id: log.user_id.unwrap_or_default(),
        referrer_name: log.name,
        referrer_phone_number: log.phone_number,
        referrer_homeclub: log.homeclub,
        referrer_timezone: log.timezone_homeclub,
        membership_expired_date: log.membership_expired_date,
        is_deleted: log.is_deleted,
    }
}

pub fn lead_profile(log: LeadLog) -> LeadProfile {
    LeadProfile {
        lead_id: log.lead_id.unwrap_or_default(),
        source_category: log.source_category,
        preferred_location: log.preferred_location,
        timezone_location: log.timezone_location,
        current_status: log.current_status,
    }
}
