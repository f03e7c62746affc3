/// A film as mapped from the metadata service, before it has an id or a category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub year: String,
    pub description: String,
    pub image_url: String,
}
