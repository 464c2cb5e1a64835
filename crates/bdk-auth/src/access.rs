//! Auth access vocabulary
//!
//! [`AuthAction`] is the closed set of user pool operations other resources
//! may be granted. [`UserPoolAccessPolicyFactory`] maps each to
//! `cognito-idp:*` actions scoped to the user pool ARN.

use bdk_platform::{AccessAction, AccessPolicyFactory, PolicyStatement};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User pool operation that can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum AuthAction {
    AddUserToGroup,
    CreateUser,
    DeleteUser,
    DeleteUserAttributes,
    DisableUser,
    EnableUser,
    ForgetDevice,
    GetDevice,
    GetUser,
    ListUsers,
    ListUsersInGroup,
    ListGroupsForUser,
    ListDevices,
    ManageGroupMembership,
    ManageGroups,
    ManageUserDevices,
    ManagePasswordRecovery,
    RemoveUserFromGroup,
    ResetUserPassword,
    SetUserMfaPreference,
    SetUserPassword,
    SetUserSettings,
    UpdateDeviceStatus,
    UpdateUserAttributes,
}

impl AuthAction {
    /// Every action
    pub const ALL: [Self; 24] = [
        Self::AddUserToGroup,
        Self::CreateUser,
        Self::DeleteUser,
        Self::DeleteUserAttributes,
        Self::DisableUser,
        Self::EnableUser,
        Self::ForgetDevice,
        Self::GetDevice,
        Self::GetUser,
        Self::ListUsers,
        Self::ListUsersInGroup,
        Self::ListGroupsForUser,
        Self::ListDevices,
        Self::ManageGroupMembership,
        Self::ManageGroups,
        Self::ManageUserDevices,
        Self::ManagePasswordRecovery,
        Self::RemoveUserFromGroup,
        Self::ResetUserPassword,
        Self::SetUserMfaPreference,
        Self::SetUserPassword,
        Self::SetUserSettings,
        Self::UpdateDeviceStatus,
        Self::UpdateUserAttributes,
    ];

    /// `cognito-idp` IAM actions this operation needs
    #[must_use]
    pub fn iam_actions(self) -> &'static [&'static str] {
        match self {
            Self::AddUserToGroup => &["cognito-idp:AdminAddUserToGroup"],
            Self::CreateUser => &["cognito-idp:AdminCreateUser"],
            Self::DeleteUser => &["cognito-idp:AdminDeleteUser"],
            Self::DeleteUserAttributes => &["cognito-idp:AdminDeleteUserAttributes"],
            Self::DisableUser => &["cognito-idp:AdminDisableUser"],
            Self::EnableUser => &["cognito-idp:AdminEnableUser"],
            Self::ForgetDevice => &["cognito-idp:AdminForgetDevice"],
            Self::GetDevice => &["cognito-idp:AdminGetDevice"],
            Self::GetUser => &["cognito-idp:AdminGetUser"],
            Self::ListUsers => &["cognito-idp:ListUsers"],
            Self::ListUsersInGroup => &["cognito-idp:ListUsersInGroup"],
            Self::ListGroupsForUser => &["cognito-idp:AdminListGroupsForUser"],
            Self::ListDevices => &["cognito-idp:AdminListDevices"],
            Self::ManageGroupMembership => &[
                "cognito-idp:AdminAddUserToGroup",
                "cognito-idp:AdminRemoveUserFromGroup",
            ],
            Self::ManageGroups => &[
                "cognito-idp:GetGroup",
                "cognito-idp:ListGroups",
                "cognito-idp:CreateGroup",
                "cognito-idp:DeleteGroup",
                "cognito-idp:UpdateGroup",
            ],
            Self::ManageUserDevices => &[
                "cognito-idp:AdminForgetDevice",
                "cognito-idp:AdminGetDevice",
                "cognito-idp:AdminListDevices",
                "cognito-idp:AdminUpdateDeviceStatus",
            ],
            Self::ManagePasswordRecovery => &[
                "cognito-idp:AdminResetUserPassword",
                "cognito-idp:AdminSetUserPassword",
            ],
            Self::RemoveUserFromGroup => &["cognito-idp:AdminRemoveUserFromGroup"],
            Self::ResetUserPassword => &["cognito-idp:AdminResetUserPassword"],
            Self::SetUserMfaPreference => &["cognito-idp:AdminSetUserMFAPreference"],
            Self::SetUserPassword => &["cognito-idp:AdminSetUserPassword"],
            Self::SetUserSettings => &["cognito-idp:AdminSetUserSettings"],
            Self::UpdateDeviceStatus => &["cognito-idp:AdminUpdateDeviceStatus"],
            Self::UpdateUserAttributes => &["cognito-idp:AdminUpdateUserAttributes"],
        }
    }
}

impl AccessAction for AuthAction {
    fn default_actions() -> Vec<Self> {
        vec![Self::GetUser]
    }

    fn name(self) -> &'static str {
        match self {
            Self::AddUserToGroup => "addUserToGroup",
            Self::CreateUser => "createUser",
            Self::DeleteUser => "deleteUser",
            Self::DeleteUserAttributes => "deleteUserAttributes",
            Self::DisableUser => "disableUser",
            Self::EnableUser => "enableUser",
            Self::ForgetDevice => "forgetDevice",
            Self::GetDevice => "getDevice",
            Self::GetUser => "getUser",
            Self::ListUsers => "listUsers",
            Self::ListUsersInGroup => "listUsersInGroup",
            Self::ListGroupsForUser => "listGroupsForUser",
            Self::ListDevices => "listDevices",
            Self::ManageGroupMembership => "manageGroupMembership",
            Self::ManageGroups => "manageGroups",
            Self::ManageUserDevices => "manageUserDevices",
            Self::ManagePasswordRecovery => "managePasswordRecovery",
            Self::RemoveUserFromGroup => "removeUserFromGroup",
            Self::ResetUserPassword => "resetUserPassword",
            Self::SetUserMfaPreference => "setUserMfaPreference",
            Self::SetUserPassword => "setUserPassword",
            Self::SetUserSettings => "setUserSettings",
            Self::UpdateDeviceStatus => "updateDeviceStatus",
            Self::UpdateUserAttributes => "updateUserAttributes",
        }
    }
}

impl FromStr for AuthAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| format!("unknown auth action `{s}`"))
    }
}

/// Statements scoped to one user pool
#[derive(Debug, Clone)]
pub struct UserPoolAccessPolicyFactory {
    user_pool_arn: String,
}

impl UserPoolAccessPolicyFactory {
    /// Create factory for a user pool
    #[inline]
    #[must_use]
    pub fn new(user_pool_arn: impl Into<String>) -> Self {
        Self {
            user_pool_arn: user_pool_arn.into(),
        }
    }
}

impl AccessPolicyFactory<AuthAction> for UserPoolAccessPolicyFactory {
    fn statements_for(&self, action: AuthAction) -> Vec<PolicyStatement> {
        vec![PolicyStatement::allow(
            action.iam_actions().iter().copied(),
            [self.user_pool_arn.clone()],
        )]
    }
}
