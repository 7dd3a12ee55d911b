/// State of an asynchronous load, in the style of Elm's RemoteData.
///
/// Replaces a `loading: bool` plus `error: Option<_>` pair with one value
/// that cannot be loading and failed at the same time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource<T, E = String> {
    /// Nothing requested yet
    NotAsked,
    Loading,
    Success(T),
    Failure(E),
}

impl<T, E> Resource<T, E> {
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Resource::Success(data),
            Err(e) => Resource::Failure(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Resource::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Resource::Failure(_))
    }

    /// Reference to the data if successful
    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Resource::Failure(e) => Some(e),
            _ => None,
        }
    }
}

impl<T, E> Default for Resource<T, E> {
    fn default() -> Self {
        Resource::NotAsked
    }
}

impl<T, E> From<Result<T, E>> for Resource<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Resource::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: Resource<u32> = Ok(3).into();
        assert_eq!(ok.data(), Some(&3));
        assert!(ok.error().is_none());

        let failed: Resource<u32> = Err("boom".to_string()).into();
        assert!(failed.is_failure());
        assert_eq!(failed.error().map(String::as_str), Some("boom"));
        assert!(!Resource::<u32>::default().is_loading());
    }
}
