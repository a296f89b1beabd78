use uuid::Uuid;

use crate::models::booking::Booking;
use crate::models::payment::{Payable, Payment};
use crate::models::plan::Plan;
use crate::models::tour::Tour;
use crate::models::user::{Role, User};
use crate::workflow::error::WorkflowError;

/// The authenticated principal a rule is evaluated against. Handlers build
/// one from the bearer token lookup and thread it through every check, so
/// authorization never depends on request-local globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Actor { id, role }
    }

    pub fn from_user(user: &User) -> Self {
        Actor {
            id: user.id,
            role: user.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_guide_of(&self, tour: &Tour) -> bool {
        self.role == Role::Guide && self.id == tour.guide_id
    }

    pub fn owns_booking(&self, booking: &Booking) -> bool {
        self.id == booking.tourist_id
    }

    pub fn owns_payment(&self, payment: &Payment) -> bool {
        self.id == payment.payer_id
    }

    pub fn owns_plan(&self, plan: &Plan) -> bool {
        self.id == plan.tourist_id
    }
}

/// Tours are published by guides; admins may publish on their behalf.
pub fn ensure_can_create_tour(actor: &Actor) -> Result<(), WorkflowError> {
    match actor.role {
        Role::Guide | Role::Admin => Ok(()),
        Role::Tourist => Err(WorkflowError::Unauthorized),
    }
}

/// Plans belong to the tourist who drafts them.
pub fn ensure_can_create_plan(actor: &Actor) -> Result<(), WorkflowError> {
    if actor.role == Role::Tourist {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

pub fn ensure_can_view_plan(actor: &Actor, plan: &Plan) -> Result<(), WorkflowError> {
    if actor.owns_plan(plan) || actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

/// Approve/reject on a booking is reserved for the tour's guide or an admin.
pub fn ensure_can_review_booking(actor: &Actor, tour: &Tour) -> Result<(), WorkflowError> {
    if actor.is_guide_of(tour) || actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

pub fn ensure_can_view_booking(
    actor: &Actor,
    booking: &Booking,
    tour: &Tour,
) -> Result<(), WorkflowError> {
    if actor.owns_booking(booking) || actor.is_guide_of(tour) || actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

pub fn ensure_can_modify_booking(actor: &Actor, booking: &Booking) -> Result<(), WorkflowError> {
    if actor.owns_booking(booking) || actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

pub fn ensure_can_cancel_booking(actor: &Actor, booking: &Booking) -> Result<(), WorkflowError> {
    if actor.owns_booking(booking) || actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

/// Payment review (approve/reject/bulk) is an admin-only surface.
pub fn ensure_can_review_payments(actor: &Actor) -> Result<(), WorkflowError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

pub fn ensure_can_view_payment(actor: &Actor, payment: &Payment) -> Result<(), WorkflowError> {
    if actor.owns_payment(payment) || actor.is_admin() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}

/// Only the user who owes a payable may submit a payment for it. Admins get
/// no bypass here: paying on someone else's behalf is not a supported flow.
pub fn ensure_can_pay(actor: &Actor, payable: &Payable) -> Result<(), WorkflowError> {
    if actor.id == payable.owner_id() {
        Ok(())
    } else {
        Err(WorkflowError::Unauthorized)
    }
}
