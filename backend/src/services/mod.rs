//! # Services Module
//!
//! This module contains the core business logic services for the
//! StayHub backend. Each service handles a specific domain.
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `BookingManager` | Booking lifecycle, payments, refunds, reviews |
//! | `AvailabilityEngine` | Date validation, overlap checks, price quotes |
//! | `AccessControl` | Role hierarchy, suspension, caller resolution |
//! | `AccountService` | Registration, login, session tokens |
//! | `ListingService` | Host onboarding, listings, search |
//! | `ModerationService` | Listing approval, user suspension |
//! | `DisputeService` | Booking disputes |
//! | `StayCompletionSweeper` | Background completion of finished stays |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                    BookingManager                         │   │
//! │  │  • create()   • set_status()   • cancel()                 │   │
//! │  │  • pay()      • refund_booking()   • review()             │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │         ┌────────────────────┼────────────────────┐             │
//! │         ▼                    ▼                    ▼             │
//! │  ┌────────────┐      ┌────────────┐       ┌────────────┐       │
//! │  │Availability│      │   Access   │       │  Payment   │       │
//! │  │   Engine   │      │  Control   │       │  Gateway   │       │
//! │  │            │      │            │       │            │       │
//! │  │ Overlaps   │      │ Roles      │       │ Charge     │       │
//! │  │ Pricing    │      │ Ownership  │       │ Refund     │       │
//! │  └────────────┘      └────────────┘       └────────────┘       │
//! │                              │                                   │
//! │                              ▼                                   │
//! │                   MarketplaceStore (db)                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod accounts;
pub mod availability;
pub mod booking_manager;
pub mod disputes;
pub mod error;
pub mod listing_service;
pub mod moderation;
pub mod payment_gateway;
pub mod rate_limiter;
pub mod stay_completion;

pub use access::{AccessControl, Actor};
pub use accounts::AccountService;
pub use availability::AvailabilityEngine;
pub use booking_manager::BookingManager;
pub use disputes::DisputeService;
pub use error::ServiceError;
pub use listing_service::ListingService;
pub use moderation::ModerationService;
pub use payment_gateway::{MockPaymentGateway, PaymentGateway};
pub use rate_limiter::RateLimiter;
pub use stay_completion::StayCompletionSweeper;
