// Per-operation authorization rules

use crate::auth::{error::AuthError, models::User};

/// Every operation the API exposes on users and products
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListUsers,
    ViewUser,
    Register,
    Login,
    Refresh,
    ForgotPassword,
    ValidateRecoveryToken,
    ResetPassword,
    ViewProfile,
    UpdateUser,
    DeleteUser,
    ChangePassword,
    ListProducts,
    ViewProduct,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
}

/// What the caller must present for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    /// Authenticated and the target user id equals the caller's id
    Owner,
}

impl Operation {
    pub fn requirement(self) -> Requirement {
        use Operation::*;
        match self {
            ListUsers | ViewUser | Register | Login | Refresh | ForgotPassword
            | ValidateRecoveryToken | ResetPassword | ListProducts | ViewProduct => {
                Requirement::Public
            }
            ViewProfile | CreateProduct | UpdateProduct | DeleteProduct => {
                Requirement::Authenticated
            }
            UpdateUser | DeleteUser | ChangePassword => Requirement::Owner,
        }
    }

    fn forbidden_message(self) -> &'static str {
        match self {
            Operation::DeleteUser => "Você só pode deletar seu próprio perfil",
            Operation::ChangePassword => "Você só pode alterar sua própria senha",
            _ => "Você só pode atualizar seu próprio perfil",
        }
    }
}

/// Decide whether `identity` may perform `operation` on the user `target`.
///
/// `target` is only consulted for owner-scoped operations; a missing target
/// there is treated as a mismatch.
pub fn authorize(
    operation: Operation,
    identity: Option<&User>,
    target: Option<i32>,
) -> Result<(), AuthError> {
    match operation.requirement() {
        Requirement::Public => Ok(()),
        Requirement::Authenticated => identity.map(|_| ()).ok_or(AuthError::MissingToken),
        Requirement::Owner => {
            let caller = identity.ok_or(AuthError::MissingToken)?;
            if target == Some(caller.id) {
                Ok(())
            } else {
                Err(AuthError::Forbidden(operation.forbidden_message()))
            }
        }
    }
}
