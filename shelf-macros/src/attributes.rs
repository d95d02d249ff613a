use bae::FromAttributes;

#[derive(Default, FromAttributes)]
#[bae("shelf")]
pub struct RootAttrs {
    pub table: Option<syn::LitStr>,
    pub timestamps: Option<()>,
}

#[derive(Default, FromAttributes)]
#[bae("shelf")]
pub struct ItemAttrs {
    pub auto_increment: Option<()>,
    pub db_type: Option<syn::LitStr>,
    pub default: Option<syn::Lit>,
    pub default_raw: Option<syn::LitStr>,
    pub max_len: Option<syn::LitInt>,
    pub primary_key: Option<()>,
    pub unique: Option<()>,
}
