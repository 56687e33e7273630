//! Containers, including [`OneOrMore`].

/// A container for at least one item.  Pipeline stages use it to
/// report every error they found, since a stage which fails has
/// found at least one.  Nothing reduces the length of the
/// container.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OneOrMore<T> {
    // Never empty.
    items: Vec<T>,
}

impl<T> OneOrMore<T> {
    /// Create an instance of `OneOrMore<T>` from a single `T`.
    #[must_use]
    pub fn new(head: T) -> OneOrMore<T> {
        OneOrMore { items: vec![head] }
    }

    /// Create an instance of `OneOrMore<T>` from a single `T` value
    /// and zero or more additional `T` values.
    #[must_use]
    pub fn with_tail<I>(head: T, tail: I) -> OneOrMore<T>
    where
        I: IntoIterator<Item = T>,
    {
        let mut items = vec![head];
        items.extend(tail);
        OneOrMore { items }
    }

    /// Return a reference to the first item.
    #[must_use]
    pub fn first(&self) -> &T {
        &self.items[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a OneOrMore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Accumulates errors while a pipeline stage runs, and turns them
/// into the stage's result at the end.
#[derive(Debug)]
pub(crate) struct ErrorList<E> {
    errors: Vec<E>,
}

impl<E> Default for ErrorList<E> {
    fn default() -> ErrorList<E> {
        ErrorList { errors: Vec::new() }
    }
}

impl<E> ErrorList<E> {
    pub(crate) fn push(&mut self, e: E) {
        self.errors.push(e);
    }

    /// Record the error of a failed step and continue.
    pub(crate) fn record<T>(&mut self, r: Result<T, E>) -> Option<T> {
        match r {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    pub(crate) fn into_result<T>(self, value: T) -> Result<T, OneOrMore<E>> {
        let mut errors = self.errors.into_iter();
        match errors.next() {
            Some(head) => Err(OneOrMore::with_tail(head, errors)),
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod one_or_more_tests {
    use super::{ErrorList, OneOrMore};

    #[test]
    fn test_iter() {
        let v: OneOrMore<u32> = OneOrMore::with_tail(1, vec![2]);
        assert_eq!(v.first(), &1);
        let mut it = v.iter();
        assert_eq!(it.next(), Some(&1));
        assert_eq!(it.next(), Some(&2));
        assert_eq!(it.next(), None);
        assert_eq!((&v).into_iter().count(), v.len());
    }

    #[test]
    fn test_error_list_result() {
        let empty: ErrorList<&str> = ErrorList::default();
        assert_eq!(empty.into_result(7), Ok(7));

        let mut errors: ErrorList<&str> = ErrorList::default();
        assert_eq!(errors.record(Ok::<u8, &str>(3)), Some(3));
        assert_eq!(errors.record(Err::<u8, &str>("first")), None);
        errors.push("second");
        assert_eq!(
            errors.into_result(7),
            Err(OneOrMore::with_tail("first", ["second"]))
        );
    }
}
