use super::api_path;
use crate::api_client::{ApiClient, ApiClientError};
use splitter_core::{
    AddMemberRequest, CreateGroupRequest, CreateInvitationRequest, Group, GroupId,
    GroupInvitation, GroupMember, GroupWithMembers, MemberRole, UpdateGroupRequest,
    UpdateMemberRoleRequest, UserId,
};

pub struct GroupsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> GroupsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Groups the signed-in user belongs to.
    pub async fn list(&self) -> Result<Vec<Group>, ApiClientError> {
        self.client.get_json(&api_path("/groups"), Vec::new()).await
    }

    pub async fn get(&self, id: GroupId) -> Result<GroupWithMembers, ApiClientError> {
        let path = api_path(&format!("/groups/{}", id));
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn create(&self, req: &CreateGroupRequest) -> Result<Group, ApiClientError> {
        self.client.post_json(&api_path("/groups"), req).await
    }

    pub async fn update(&self, id: GroupId, req: &UpdateGroupRequest) -> Result<Group, ApiClientError> {
        let path = api_path(&format!("/groups/{}", id));
        self.client.put_json(&path, req).await
    }

    pub async fn delete(&self, id: GroupId) -> Result<(), ApiClientError> {
        let path = api_path(&format!("/groups/{}", id));
        self.client.delete_unit(&path).await
    }

    pub async fn members(&self, group_id: GroupId) -> Result<Vec<GroupMember>, ApiClientError> {
        let path = api_path(&format!("/groups/{}/members", group_id));
        self.client.get_json(&path, Vec::new()).await
    }

    pub async fn add_member(&self, group_id: GroupId, user_id: UserId) -> Result<GroupMember, ApiClientError> {
        let path = api_path(&format!("/groups/{}/members", group_id));
        self.client
            .post_json(&path, &AddMemberRequest { user_id })
            .await
    }

    pub async fn remove_member(&self, group_id: GroupId, user_id: UserId) -> Result<(), ApiClientError> {
        let path = api_path(&format!("/groups/{}/members/{}", group_id, user_id));
        self.client.delete_unit(&path).await
    }

    pub async fn update_member_role(
        &self,
        group_id: GroupId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<GroupMember, ApiClientError> {
        let path = api_path(&format!("/groups/{}/members/{}", group_id, user_id));
        self.client
            .patch_json(&path, &UpdateMemberRoleRequest { role })
            .await
    }

    // ------------------------------------------------------------------------
    // Invitations
    // ------------------------------------------------------------------------

    pub async fn create_invitation(
        &self,
        group_id: GroupId,
        email: &str,
    ) -> Result<GroupInvitation, ApiClientError> {
        let body = CreateInvitationRequest {
            group_id,
            email: email.to_string(),
        };
        self.client.post_json(&api_path("/invitations"), &body).await
    }

    pub async fn accept_invitation(&self, token: &str) -> Result<GroupMember, ApiClientError> {
        let path = api_path(&format!("/invitations/{}/accept", token));
        self.client.post_empty(&path).await
    }

    pub async fn decline_invitation(&self, token: &str) -> Result<(), ApiClientError> {
        let path = api_path(&format!("/invitations/{}/decline", token));
        self.client.post_unit::<()>(&path, None).await
    }

    pub async fn pending_invitations(&self) -> Result<Vec<GroupInvitation>, ApiClientError> {
        self.client
            .get_json(&api_path("/invitations/pending"), Vec::new())
            .await
    }
}
