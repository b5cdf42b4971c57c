//! Business metrics for the hostel service.
//!
//! Counters are emitted where the events happen (services and the Daraja
//! client); this module only registers their descriptions with the
//! installed recorder.

use metrics::describe_counter;

/// Bookings created.
pub const BOOKINGS_CREATED: &str = "hostel.bookings.created";

/// Bookings allocated, labelled `path` = `admin` | `payment`.
pub const ALLOCATIONS: &str = "hostel.allocations";

/// Callbacks handled, labelled `outcome`.
pub const PAYMENT_CALLBACKS: &str = "hostel.payments.callbacks";

/// STK push attempts, labelled `outcome` (emitted by `hostel-mpesa`).
pub const GATEWAY_REQUESTS: &str = "hostel.gateway.requests";

/// Register descriptions for every business counter.
pub fn register_business_metrics() {
    describe_counter!(BOOKINGS_CREATED, "Total number of booking requests created");
    describe_counter!(
        ALLOCATIONS,
        "Total number of bookings allocated, by path (admin, payment)"
    );
    describe_counter!(
        PAYMENT_CALLBACKS,
        "Total number of payment callbacks handled, by outcome"
    );
    describe_counter!(
        GATEWAY_REQUESTS,
        "Total number of STK push requests sent to the gateway, by outcome"
    );
}
