/// Ownership resolution and the access policy engine
///
/// Every resource mutation in the platform goes through `authorize` with the
/// same precedence: the resource must exist (checked by the caller, which
/// maps a missing row to NotFound), the path student and the resource's own
/// student reference must agree, then the declarative role/ownership rule
/// for the operation applies. Keeping the rule table in one place is what
/// stops seven near-identical inline checks from drifting apart.
use crate::{
    account::Role,
    error::{ApiError, ApiResult},
};

/// Resources governed by the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Student,
    Credit,
    Goal,
    Interest,
    Achievement,
    Sanction,
    Event,
    Participation,
    Portfolio,
    Report,
}

/// Operations governed by the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Validate,
    Participate,
    Confirm,
    Attend,
    Recommend,
    RemoveRecommendation,
}

/// Who an operation is open to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    /// The user account that owns the target resource
    Owner,
    /// Any authenticated student (ownership checked separately where needed)
    Student,
    Teacher,
    Admin,
}

/// The requesting identity, as resolved by the auth extractor
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// Exact identity match after normalizing both ids to a canonical form.
/// Ids can arrive in mixed case or with stray whitespace depending on the
/// client, so both sides are trimmed and lowercased before comparison.
pub fn is_owner(resource_owner_user_id: &str, requesting_user_id: &str) -> bool {
    canonical_id(resource_owner_user_id) == canonical_id(requesting_user_id)
}

/// Role membership test
pub fn is_privileged(role: Role, allowed_roles: &[Role]) -> bool {
    allowed_roles.contains(&role)
}

fn canonical_id(id: &str) -> String {
    id.trim().to_ascii_lowercase()
}

/// The declarative rule table: who may perform which operation on which
/// resource. Reproduces the access matrix exactly; entity-specific state
/// invariants (e.g. "owner may delete a credit only while not validated")
/// stay in the owning service.
pub fn rules(resource: Resource, action: Action) -> &'static [Principal] {
    use self::{Action as A, Principal as P, Resource as R};

    match (resource, action) {
        (R::Student, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        (R::Student, A::Create) => &[P::Student],
        (R::Student, A::Update) => &[P::Owner, P::Admin],
        (R::Student, A::Delete) => &[P::Admin],

        (R::Credit, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        (R::Credit, A::Create) => &[P::Owner],
        (R::Credit, A::Update) => &[P::Owner, P::Admin],
        (R::Credit, A::Validate) => &[P::Teacher, P::Admin],
        (R::Credit, A::Delete) => &[P::Owner, P::Admin],

        (R::Goal, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        (R::Goal, A::Update) | (R::Goal, A::Delete) => &[P::Owner, P::Admin],

        (R::Interest, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        (R::Interest, A::Update) => &[P::Owner, P::Admin],

        (R::Achievement, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        (R::Achievement, A::Create) | (R::Achievement, A::Delete) => &[P::Owner, P::Admin],

        (R::Sanction, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        // Never the student, even if owner
        (R::Sanction, A::Update) => &[P::Teacher, P::Admin],

        (R::Event, A::Read) => &[P::Student, P::Teacher, P::Admin],
        (R::Event, A::Create) => &[P::Teacher, P::Admin],
        (R::Event, A::Update) | (R::Event, A::Delete) => &[P::Owner, P::Admin],
        (R::Event, A::Participate) => &[P::Student],

        (R::Participation, A::Confirm) => &[P::Owner],
        (R::Participation, A::Attend) => &[P::Teacher, P::Admin],
        (R::Participation, A::Update) => &[P::Owner],

        (R::Portfolio, A::Read) => &[P::Owner, P::Teacher, P::Admin],
        (R::Portfolio, A::Update) => &[P::Owner, P::Admin],
        (R::Portfolio, A::Recommend) => &[P::Owner, P::Teacher, P::Admin],
        (R::Portfolio, A::RemoveRecommendation) => &[P::Owner, P::Admin],

        (R::Report, A::Read) => &[P::Teacher, P::Admin],

        _ => &[],
    }
}

/// Apply the role/ownership rule for an operation.
///
/// `owner_user_id` is the concrete owner User id of the target resource
/// (already resolved through StudentProfile where applicable), or None for
/// resources without a meaningful owner in this operation.
pub fn authorize(
    resource: Resource,
    action: Action,
    actor: &Actor,
    owner_user_id: Option<&str>,
) -> ApiResult<()> {
    for principal in rules(resource, action) {
        let allowed = match principal {
            Principal::Owner => owner_user_id
                .map(|owner| is_owner(owner, &actor.user_id))
                .unwrap_or(false),
            Principal::Student => actor.role == Role::Student,
            Principal::Teacher => actor.role == Role::Teacher,
            Principal::Admin => actor.role == Role::Admin,
        };
        if allowed {
            return Ok(());
        }
    }

    Err(ApiError::Forbidden(format!(
        "Operation not permitted for role {}",
        actor.role.as_str()
    )))
}

/// Precedence step 2: when the request path names a student and the resource
/// carries its own student reference, the two must agree. Surfaced as a
/// SubjectMismatch (400), distinct from NotFound.
pub fn ensure_subject_match(path_student_id: &str, resource_student_id: &str) -> ApiResult<()> {
    if canonical_id(path_student_id) != canonical_id(resource_student_id) {
        return Err(ApiError::Mismatch(
            "Resource does not belong to the referenced student".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str) -> Actor {
        Actor::new(id, Role::Student)
    }

    fn teacher() -> Actor {
        Actor::new("teacher-1", Role::Teacher)
    }

    fn admin() -> Actor {
        Actor::new("admin-1", Role::Admin)
    }

    #[test]
    fn owner_comparison_is_canonical() {
        assert!(is_owner("User-42", "user-42"));
        assert!(is_owner(" user-42 ", "USER-42"));
        assert!(!is_owner("user-42", "user-43"));
    }

    #[test]
    fn privileged_membership() {
        assert!(is_privileged(Role::Teacher, &[Role::Teacher, Role::Admin]));
        assert!(!is_privileged(Role::Student, &[Role::Teacher, Role::Admin]));
    }

    #[test]
    fn credit_read_allows_owner_and_staff() {
        let owner = student("s1");
        assert!(authorize(Resource::Credit, Action::Read, &owner, Some("s1")).is_ok());
        assert!(authorize(Resource::Credit, Action::Read, &teacher(), Some("s1")).is_ok());
        assert!(authorize(Resource::Credit, Action::Read, &admin(), Some("s1")).is_ok());

        let other = student("s2");
        assert!(authorize(Resource::Credit, Action::Read, &other, Some("s1")).is_err());
    }

    #[test]
    fn credit_validate_is_staff_only() {
        let owner = student("s1");
        assert!(authorize(Resource::Credit, Action::Validate, &owner, Some("s1")).is_err());
        assert!(authorize(Resource::Credit, Action::Validate, &teacher(), Some("s1")).is_ok());
        assert!(authorize(Resource::Credit, Action::Validate, &admin(), Some("s1")).is_ok());
    }

    #[test]
    fn sanction_update_denies_owner() {
        // The owning student must never update their own sanction record
        let owner = student("s1");
        assert!(authorize(Resource::Sanction, Action::Update, &owner, Some("s1")).is_err());
        assert!(authorize(Resource::Sanction, Action::Update, &teacher(), Some("s1")).is_ok());
    }

    #[test]
    fn goal_write_excludes_teacher() {
        assert!(authorize(Resource::Goal, Action::Update, &teacher(), Some("s1")).is_err());
        assert!(authorize(Resource::Goal, Action::Update, &admin(), Some("s1")).is_ok());
        let owner = student("s1");
        assert!(authorize(Resource::Goal, Action::Update, &owner, Some("s1")).is_ok());
    }

    #[test]
    fn interest_write_excludes_teacher() {
        assert!(authorize(Resource::Interest, Action::Read, &teacher(), Some("s1")).is_ok());
        assert!(authorize(Resource::Interest, Action::Update, &teacher(), Some("s1")).is_err());
    }

    #[test]
    fn event_create_requires_staff() {
        assert!(authorize(Resource::Event, Action::Create, &student("s1"), None).is_err());
        assert!(authorize(Resource::Event, Action::Create, &teacher(), None).is_ok());
    }

    #[test]
    fn event_mutation_restricted_to_creator_or_admin() {
        let creator = Actor::new("t1", Role::Teacher);
        let other_teacher = Actor::new("t2", Role::Teacher);
        assert!(authorize(Resource::Event, Action::Update, &creator, Some("t1")).is_ok());
        assert!(authorize(Resource::Event, Action::Update, &other_teacher, Some("t1")).is_err());
        assert!(authorize(Resource::Event, Action::Delete, &admin(), Some("t1")).is_ok());
    }

    #[test]
    fn participation_attend_is_staff_only() {
        let owner = student("s1");
        assert!(authorize(Resource::Participation, Action::Attend, &owner, Some("s1")).is_err());
        assert!(authorize(Resource::Participation, Action::Attend, &teacher(), Some("s1")).is_ok());
    }

    #[test]
    fn portfolio_recommend_open_to_staff_and_owner() {
        let owner = student("s1");
        assert!(authorize(Resource::Portfolio, Action::Recommend, &owner, Some("s1")).is_ok());
        assert!(authorize(Resource::Portfolio, Action::Recommend, &teacher(), Some("s1")).is_ok());
        assert!(
            authorize(Resource::Portfolio, Action::RemoveRecommendation, &teacher(), Some("s1"))
                .is_err()
        );
    }

    #[test]
    fn reports_are_staff_only() {
        assert!(authorize(Resource::Report, Action::Read, &student("s1"), None).is_err());
        assert!(authorize(Resource::Report, Action::Read, &teacher(), None).is_ok());
        assert!(authorize(Resource::Report, Action::Read, &admin(), None).is_ok());
    }

    #[test]
    fn subject_mismatch_is_distinct_error() {
        let err = ensure_subject_match("student-a", "student-b").unwrap_err();
        assert!(matches!(err, ApiError::Mismatch(_)));
        assert!(ensure_subject_match("Student-A", " student-a ").is_ok());
    }
}
