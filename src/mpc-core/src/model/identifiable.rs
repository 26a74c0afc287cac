/// Common identity accessors shared by every marketplace entity.
///
/// Entities are compared by whichever identity facet the caller cares about;
/// there is no single notion of equality across the model.
pub trait Identifiable {
    fn id(&self) -> Option<&str>;

    fn name(&self) -> Option<&str>;

    fn url(&self) -> Option<&str>;
}

/// True when both sides carry an id and the ids match.
pub fn equals_id<A, B>(a: &A, b: &B) -> bool
where
    A: Identifiable + ?Sized,
    B: Identifiable + ?Sized,
{
    matches!((a.id(), b.id()), (Some(x), Some(y)) if x == y)
}

/// True when both sides carry a url and the urls match.
pub fn equals_url<A, B>(a: &A, b: &B) -> bool
where
    A: Identifiable + ?Sized,
    B: Identifiable + ?Sized,
{
    matches!((a.url(), b.url()), (Some(x), Some(y)) if x == y)
}

/// True when both sides carry a name and the names match.
pub fn equals_name<A, B>(a: &A, b: &B) -> bool
where
    A: Identifiable + ?Sized,
    B: Identifiable + ?Sized,
{
    matches!((a.name(), b.name()), (Some(x), Some(y)) if x == y)
}

/// Implements [`Identifiable`] for records with `id`, `name` and `url`
/// fields of type `Option<String>`.
macro_rules! impl_identifiable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::model::Identifiable for $ty {
                fn id(&self) -> Option<&str> {
                    self.id.as_deref()
                }

                fn name(&self) -> Option<&str> {
                    self.name.as_deref()
                }

                fn url(&self) -> Option<&str> {
                    self.url.as_deref()
                }
            }
        )+
    };
}

pub(crate) use impl_identifiable;
