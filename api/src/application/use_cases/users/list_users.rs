use crate::application::errors::AppResult;
use crate::application::pagination::{Page, PageRequest};
use crate::application::ports::user_repository::UserRepository;
use crate::domain::users::user::User;

pub struct ListUsers<'a, U: UserRepository + ?Sized> {
    pub users: &'a U,
}

impl<'a, U: UserRepository + ?Sized> ListUsers<'a, U> {
    pub async fn execute(&self, search: Option<&str>, page: PageRequest) -> AppResult<Page<User>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.users.list(search, page).await?)
    }
}
