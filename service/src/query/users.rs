//! Administrative [`Query`]s of [`User`]s.

use common::operations::By;

use crate::{domain::User, infra::backend::admin};

use super::BackendQuery;

#[cfg(doc)]
use super::Query;

/// [`Query`] listing all the registered [`User`]s.
///
/// Requires the elevated backend credentials.
pub type List = BackendQuery<By<Vec<User>, admin::All>>;

#[cfg(test)]
mod spec {
    use crate::{
        infra::backend::{self, admin},
        Query as _,
    };

    use super::List;

    #[tokio::test]
    async fn unavailable_without_admin_client() {
        let err = crate::spec::service()
            .execute(List::by(admin::All))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), backend::Error::AdminUnavailable));
    }
}
